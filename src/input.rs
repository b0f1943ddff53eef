//! Input file type dispatch

use crate::error::OcrError;
use crate::pdf;
use std::path::Path;

/// Image extensions accepted as OCR input
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "pnm", "png", "jfif", "jpeg", "jpg", "tiff", "webp", "ppm",
];

/// What kind of document a path points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Raster image, carrying its lowercased extension
    Image(String),
    Pdf,
}

impl InputKind {
    /// Classify a file by extension, falling back to the PDF magic bytes
    pub fn detect(path: &Path) -> Result<Self, OcrError> {
        if !path.is_file() {
            return Err(OcrError::InputNotFound(path.to_path_buf()));
        }

        match extension(path).as_deref() {
            Some("pdf") => return Ok(Self::Pdf),
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => {
                return Ok(Self::Image(ext.to_string()));
            }
            _ => {}
        }

        if pdf::is_pdf(path)? {
            return Ok(Self::Pdf);
        }

        Err(OcrError::UnsupportedFormat {
            path: path.to_path_buf(),
            supported: supported_extensions().join(", "),
        })
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    /// Default base name for saved output
    pub fn default_output_name(&self) -> &'static str {
        match self {
            Self::Image(_) => "img_output",
            Self::Pdf => "pdf_output",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Image(ext) => ext,
            Self::Pdf => "pdf",
        }
    }
}

/// Every accepted input extension, PDF first
pub fn supported_extensions() -> Vec<&'static str> {
    std::iter::once("pdf")
        .chain(IMAGE_EXTENSIONS.iter().copied())
        .collect()
}

/// Lowercased text after the last dot of the file name
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
