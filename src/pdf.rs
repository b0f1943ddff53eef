//! PDF to page images
//!
//! Pages are rendered with pdfium when the library can be bound. Without it,
//! the largest image embedded in each page is pulled out with lopdf, which
//! covers the common case of scanned documents.

use crate::error::OcrError;
use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Rendering resolution used when none is configured
pub const DEFAULT_DPI: f32 = 200.0;

/// Embedded text shorter than this is treated as absent
const MIN_TEXT_LAYER_CHARS: usize = 10;

/// PDF user space is 72 points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Guards against cyclic /Parent chains
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Converts PDF pages into images
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    dpi: f32,
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_DPI)
    }
}

impl PdfRasterizer {
    pub fn new(dpi: f32) -> Self {
        Self { dpi }
    }

    /// One image per page, in page order
    pub fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        let pages = match bind_pdfium() {
            Ok(pdfium) => self.render_pages(&pdfium, path)?,
            Err(e) => {
                tracing::warn!("{}; falling back to images embedded in the PDF", e);
                extract_page_images(path)?
            }
        };

        let pages = require_pages(path, pages)?;
        tracing::info!("Converted {} into {} page image(s)", path.display(), pages.len());
        Ok(pages)
    }

    fn render_pages(&self, pdfium: &Pdfium, path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| OcrError::Processing(format!("Failed to load PDF: {:?}", e)))?;

        let scale = self.dpi / POINTS_PER_INCH;
        let page_count = document.pages().len();
        let mut images = Vec::with_capacity(page_count as usize);

        for (index, page) in document.pages().iter().enumerate() {
            let pixel_width = (page.width().value * scale) as i32;
            let pixel_height = (page.height().value * scale) as i32;

            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(pixel_width)
                        .set_target_height(pixel_height)
                        .render_form_data(true)
                        .render_annotations(true),
                )
                .map_err(|e| {
                    OcrError::Processing(format!("Failed to render page {}: {:?}", index + 1, e))
                })?;

            tracing::debug!(
                "Rendered page {}/{} at {}x{}",
                index + 1,
                page_count,
                pixel_width,
                pixel_height
            );

            images.push(bitmap.as_image());
        }

        Ok(images)
    }
}

fn require_pages(path: &Path, pages: Vec<DynamicImage>) -> Result<Vec<DynamicImage>, OcrError> {
    if pages.is_empty() {
        return Err(OcrError::EmptyDocument(path.to_path_buf()));
    }
    Ok(pages)
}

/// Bind a local libpdfium first, then the system one
fn bind_pdfium() -> Result<Pdfium, OcrError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| {
            OcrError::Initialization(format!("Failed to load the pdfium library: {:?}", e))
        })?;

    Ok(Pdfium::new(bindings))
}

/// Embedded text of a born-digital PDF, if it has a meaningful amount
pub fn extract_text_layer(path: &Path) -> Result<Option<String>, OcrError> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| OcrError::Processing(format!("Failed to parse PDF: {}", e)))?;

    let trimmed = text.trim();
    if trimmed.chars().count() <= MIN_TEXT_LAYER_CHARS {
        return Ok(None);
    }

    tracing::info!("Extracted {} chars of text directly from PDF", trimmed.len());
    Ok(Some(trimmed.to_string()))
}

/// Check if a file is a PDF by extension or magic bytes
pub fn is_pdf(path: &Path) -> Result<bool, OcrError> {
    if let Some(ext) = path.extension() {
        if ext.to_string_lossy().to_lowercase() == "pdf" {
            return Ok(true);
        }
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 5];
    if file.read_exact(&mut magic).is_ok() {
        return Ok(&magic == b"%PDF-");
    }

    Ok(false)
}

// ============================================================================
// Embedded image fallback
// ============================================================================

/// Largest embedded image of every page, in page order
fn extract_page_images(path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
    let doc = Document::load(path)
        .map_err(|e| OcrError::Processing(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let largest = page_images(&doc, page_id)
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

        match largest {
            Some(img) => pages.push(img),
            None => tracing::warn!("Page {} has no extractable image, skipping", page_number),
        }
    }

    Ok(pages)
}

fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let Some(xobjects) = page_resources(doc, page_id)
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (name, obj) in xobjects.iter() {
        let Some(stream) = resolve(doc, obj).and_then(|o| o.as_stream().ok()) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|n| n == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        match extract_image_from_stream(doc, stream) {
            Ok(img) => images.push(img),
            Err(e) => tracing::warn!(
                "Failed to extract image /{}: {}",
                String::from_utf8_lossy(name),
                e
            ),
        }
    }

    images
}

/// Resources of a page, inherited from the page tree when not set directly
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj.as_reference() {
        Ok(id) => doc.get_object(id).ok(),
        Err(_) => Some(obj),
    }
}

fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract an image from a PDF stream
fn extract_image_from_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, OcrError> {
    // JPEG payloads decode as-is
    if stream_filters(stream).iter().any(|f| f == b"DCTDecode") {
        return image::load_from_memory(&stream.content)
            .map_err(|e| OcrError::Processing(format!("Failed to decode JPEG image: {}", e)));
    }

    let width = stream
        .dict
        .get(b"Width")
        .ok()
        .and_then(|w| w.as_i64().ok())
        .ok_or_else(|| OcrError::Processing("Missing image width".to_string()))?
        as u32;

    let height = stream
        .dict
        .get(b"Height")
        .ok()
        .and_then(|h| h.as_i64().ok())
        .ok_or_else(|| OcrError::Processing("Missing image height".to_string()))?
        as u32;

    let data = if stream_filters(stream).is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| OcrError::Processing(format!("Failed to decompress image: {}", e)))?
    };

    let color_space = get_color_space(doc, stream);

    let bits_per_component = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(8) as u8;

    tracing::debug!(
        "PDF image: {}x{}, {} bits, color_space={}, data_len={}",
        width,
        height,
        bits_per_component,
        color_space,
        data.len()
    );

    raw_to_image(&color_space, bits_per_component, width, height, data)
}

fn raw_to_image(
    color_space: &str,
    bits_per_component: u8,
    width: u32,
    height: u32,
    data: Vec<u8>,
) -> Result<DynamicImage, OcrError> {
    let pixels = width as usize * height as usize;

    match (color_space, bits_per_component) {
        ("DeviceGray", 8) if data.len() >= pixels => {
            let img = image::GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .ok_or_else(|| OcrError::Processing("Invalid grayscale image data".to_string()))?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        ("DeviceGray", 1) => {
            let img = unpack_bilevel(width, height, &data)?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        ("DeviceRGB" | "ICCBased", 8) if data.len() >= pixels * 3 => {
            let img = image::RgbImage::from_raw(width, height, data[..pixels * 3].to_vec())
                .ok_or_else(|| OcrError::Processing("Invalid RGB image data".to_string()))?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        ("DeviceCMYK", 8) if data.len() >= pixels * 4 => {
            let mut rgb_data = Vec::with_capacity(pixels * 3);
            for chunk in data.chunks_exact(4).take(pixels) {
                let c = chunk[0] as f32 / 255.0;
                let m = chunk[1] as f32 / 255.0;
                let y = chunk[2] as f32 / 255.0;
                let k = chunk[3] as f32 / 255.0;
                rgb_data.push(((1.0 - c) * (1.0 - k) * 255.0) as u8);
                rgb_data.push(((1.0 - m) * (1.0 - k) * 255.0) as u8);
                rgb_data.push(((1.0 - y) * (1.0 - k) * 255.0) as u8);
            }
            let img = image::RgbImage::from_raw(width, height, rgb_data)
                .ok_or_else(|| OcrError::Processing("Invalid CMYK->RGB conversion".to_string()))?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        _ => Err(OcrError::Processing(format!(
            "Unsupported image format: {} with {} bits, data_len={}",
            color_space,
            bits_per_component,
            data.len()
        ))),
    }
}

/// Expand 1-bit rows (padded to whole bytes, 1 = white) into 8-bit gray
fn unpack_bilevel(width: u32, height: u32, data: &[u8]) -> Result<image::GrayImage, OcrError> {
    let stride = (width as usize).div_ceil(8);
    if data.len() < stride * height as usize {
        return Err(OcrError::Processing(format!(
            "Bilevel image data too short: {} < {}",
            data.len(),
            stride * height as usize
        )));
    }

    Ok(image::GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * stride + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

/// Get the color space name from a PDF stream
fn get_color_space(doc: &Document, stream: &Stream) -> String {
    let cs_obj = match stream.dict.get(b"ColorSpace") {
        Ok(obj) => obj,
        Err(_) => return "DeviceRGB".to_string(),
    };

    let first_name = |obj: &Object| -> Option<String> {
        if let Ok(name) = obj.as_name() {
            return Some(String::from_utf8_lossy(name).to_string());
        }
        obj.as_array()
            .ok()
            .and_then(|array| array.first())
            .and_then(|first| first.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
    };

    resolve(doc, cs_obj)
        .and_then(first_name)
        .unwrap_or_else(|| "DeviceRGB".to_string())
}
