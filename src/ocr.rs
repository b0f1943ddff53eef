//! Orchestration: load a document once, then extract text, detect
//! orientation or draw boxes page by page.

use crate::annotate::{self, AnnotationKind, BoxStyle};
use crate::config::Config;
use crate::engine::{EngineOptions, OcrEngine, Orientation};
use crate::error::OcrError;
use crate::input::InputKind;
use crate::pdf::{self, PdfRasterizer};
use crate::preprocessing::Pipeline;
use image::{DynamicImage, RgbImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Separator between pages when an extraction is flattened to one string
pub const PAGE_SEPARATOR: char = '\u{c}';

/// Text recognized on one page (1-based)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    pub number: usize,
    pub text: String,
}

/// Text of a whole document
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub source: PathBuf,
    pub kind: String,
    pub pages: Vec<PageText>,
    pub processing_time_ms: u64,
}

impl Extraction {
    pub fn is_multi_page(&self) -> bool {
        self.pages.len() > 1
    }

    /// All pages, separated by form feeds
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(&PAGE_SEPARATOR.to_string())
    }
}

/// OSD result for one page
#[derive(Debug, Clone, Serialize)]
pub struct PageOrientation {
    pub page: usize,
    #[serde(flatten)]
    pub orientation: Orientation,
}

/// Annotated image for one page, ready to save
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    pub page: usize,
    pub boxes: usize,
    pub image: RgbImage,
}

/// An input file decoded into page images
pub struct Document {
    path: PathBuf,
    kind: InputKind,
    pages: Vec<DynamicImage>,
}

impl Document {
    /// Detect the input type and decode it; PDFs are rasterized once here
    pub fn open(path: &Path, config: &Config) -> Result<Self, OcrError> {
        let kind = InputKind::detect(path)?;

        let pages = match &kind {
            InputKind::Pdf => PdfRasterizer::new(config.pdf_dpi).rasterize(path)?,
            InputKind::Image(_) => {
                let img = image::open(path).map_err(|e| {
                    OcrError::Processing(format!("Failed to load image {}: {}", path.display(), e))
                })?;
                vec![img]
            }
        };

        tracing::debug!(
            "Opened {} as {} with {} page(s)",
            path.display(),
            kind.as_str(),
            pages.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            pages,
        })
    }

    /// Wrap already-decoded pages
    pub fn from_pages(path: impl Into<PathBuf>, kind: InputKind, pages: Vec<DynamicImage>) -> Self {
        Self {
            path: path.into(),
            kind,
            pages,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &InputKind {
        &self.kind
    }

    /// Preprocess and recognize every page in order
    pub fn extract_text(
        &self,
        engine: &dyn OcrEngine,
        options: &EngineOptions,
        pipeline: &Pipeline,
    ) -> Result<Extraction, OcrError> {
        let start = Instant::now();
        let total = self.pages.len();
        let mut pages = Vec::with_capacity(total);

        for (index, page) in self.pages.iter().enumerate() {
            let number = index + 1;
            if total > 1 {
                tracing::info!("Processing page {} of {}", number, total);
            }

            let prepared = pipeline
                .process(page.clone())
                .map_err(|e| page_error(number, total, e))?;
            let text = engine
                .recognize(&prepared.image, options)
                .map_err(|e| page_error(number, total, e))?;

            pages.push(PageText { number, text });
        }

        let extraction = Extraction {
            source: self.path.clone(),
            kind: self.kind.as_str().to_string(),
            pages,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "OCR completed in {}ms, {} page(s), text length: {}",
            extraction.processing_time_ms,
            extraction.pages.len(),
            extraction.text().len()
        );

        Ok(extraction)
    }

    /// Orientation and script of every page
    pub fn detect_orientation(
        &self,
        engine: &dyn OcrEngine,
        options: &EngineOptions,
    ) -> Result<Vec<PageOrientation>, OcrError> {
        let total = self.pages.len();

        self.pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let orientation = engine
                    .detect_orientation(page, options)
                    .map_err(|e| page_error(index + 1, total, e))?;
                Ok(PageOrientation {
                    page: index + 1,
                    orientation,
                })
            })
            .collect()
    }

    /// Draw boxes on every page. Boxes are computed on the unprocessed pages so
    /// they line up with what gets drawn.
    pub fn annotate(
        &self,
        engine: &dyn OcrEngine,
        options: &EngineOptions,
        kind: &AnnotationKind,
        style: &BoxStyle,
    ) -> Result<Vec<AnnotatedPage>, OcrError> {
        let total = self.pages.len();
        let mut annotated = Vec::with_capacity(total);

        for (index, page) in self.pages.iter().enumerate() {
            let number = index + 1;

            let boxes = if kind.needs_words() {
                let words = engine
                    .words(page, options)
                    .map_err(|e| page_error(number, total, e))?;
                kind.select_words(&words)
            } else {
                let chars = engine
                    .char_boxes(page, options)
                    .map_err(|e| page_error(number, total, e))?;
                annotate::char_bboxes(&chars)
            };

            tracing::info!("Page {}: drawing {} {} box(es)", number, boxes.len(), kind);

            annotated.push(AnnotatedPage {
                page: number,
                boxes: boxes.len(),
                image: annotate::draw_boxes(page, &boxes, style),
            });
        }

        Ok(annotated)
    }
}

/// Embedded text of a born-digital PDF, read without rasterizing anything.
/// `None` for images and for PDFs without a usable text layer.
pub fn text_layer(path: &Path) -> Result<Option<Extraction>, OcrError> {
    let kind = InputKind::detect(path)?;
    if !kind.is_pdf() {
        return Ok(None);
    }

    let start = Instant::now();
    Ok(pdf::extract_text_layer(path)?.map(|text| {
        tracing::info!("Using the embedded text layer of {}", path.display());
        Extraction {
            source: path.to_path_buf(),
            kind: kind.as_str().to_string(),
            pages: vec![PageText { number: 1, text }],
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }))
}

/// Attach the page number to failures inside multi-page documents
fn page_error(page: usize, total: usize, err: OcrError) -> OcrError {
    if total > 1 {
        OcrError::Page {
            page,
            total,
            source: Box::new(err),
        }
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoundingBox, CharBox, Word};
    use crate::preprocessing::Preset;
    use image::{GrayImage, Luma, Rgb};
    use std::sync::Mutex;

    /// Engine that reports the width of each image it sees
    #[derive(Default)]
    struct FakeEngine {
        seen_widths: Mutex<Vec<u32>>,
        fail_on_width: Option<u32>,
    }

    impl OcrEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn description(&self) -> &'static str {
            "test engine"
        }

        fn recognize(
            &self,
            image: &DynamicImage,
            _options: &EngineOptions,
        ) -> Result<String, OcrError> {
            self.seen_widths.lock().unwrap().push(image.width());
            if Some(image.width()) == self.fail_on_width {
                return Err(OcrError::Processing("unreadable".to_string()));
            }
            Ok(format!("width {}", image.width()))
        }

        fn char_boxes(
            &self,
            _image: &DynamicImage,
            _options: &EngineOptions,
        ) -> Result<Vec<CharBox>, OcrError> {
            Ok(vec![CharBox {
                symbol: "A".to_string(),
                bbox: BoundingBox::new(1, 1, 3, 3),
            }])
        }

        fn words(
            &self,
            _image: &DynamicImage,
            _options: &EngineOptions,
        ) -> Result<Vec<Word>, OcrError> {
            Ok(vec![
                Word {
                    text: "Total".to_string(),
                    confidence: 91.0,
                    bbox: BoundingBox::new(0, 0, 4, 4),
                },
                Word {
                    text: "smudge".to_string(),
                    confidence: 12.0,
                    bbox: BoundingBox::new(5, 5, 4, 4),
                },
            ])
        }

        fn detect_orientation(
            &self,
            _image: &DynamicImage,
            _options: &EngineOptions,
        ) -> Result<Orientation, OcrError> {
            Err(OcrError::Unsupported {
                engine: "fake",
                operation: "orientation and script detection",
            })
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }
    }

    fn options() -> EngineOptions {
        EngineOptions::from(&Config::default())
    }

    fn page(width: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, 10, Luma([255])))
    }

    fn image_document(width: u32) -> Document {
        Document::from_pages("scan.png", InputKind::Image("png".to_string()), vec![page(width)])
    }

    #[test]
    fn test_extract_text_keeps_page_order() {
        let doc = Document::from_pages(
            "book.pdf",
            InputKind::Pdf,
            vec![page(10), page(20), page(30)],
        );
        let engine = FakeEngine::default();

        let extraction = doc
            .extract_text(&engine, &options(), &Pipeline::default())
            .unwrap();

        assert!(extraction.is_multi_page());
        assert_eq!(extraction.kind, "pdf");
        assert_eq!(
            extraction.pages.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(extraction.text(), "width 10\u{c}width 20\u{c}width 30");
    }

    #[test]
    fn test_extract_text_runs_pipeline_before_engine() {
        let doc = image_document(100);
        let engine = FakeEngine::default();

        let extraction = doc
            .extract_text(&engine, &options(), &Pipeline::from_preset(Preset::Default))
            .unwrap();

        assert!(!extraction.is_multi_page());
        // The resize step scales 72 DPI input up towards 300 DPI
        assert!(engine.seen_widths.lock().unwrap()[0] > 100);
    }

    #[test]
    fn test_failed_page_is_named_in_error() {
        let doc = Document::from_pages("book.pdf", InputKind::Pdf, vec![page(10), page(20)]);
        let engine = FakeEngine {
            fail_on_width: Some(20),
            ..FakeEngine::default()
        };

        let err = doc
            .extract_text(&engine, &options(), &Pipeline::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "page 2 of 2: Failed to process image: unreadable");
    }

    #[test]
    fn test_failed_preprocessing_is_named_in_error() {
        let doc = Document::from_pages("book.pdf", InputKind::Pdf, vec![page(10), page(0)]);

        let err = doc
            .extract_text(
                &FakeEngine::default(),
                &options(),
                &Pipeline::from_preset(Preset::Minimal),
            )
            .unwrap_err();

        match err {
            OcrError::Page {
                page: 2,
                total: 2,
                source,
            } => assert!(matches!(*source, OcrError::Preprocessing(_))),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unsupported_operation_names_page_in_multi_page_documents() {
        let doc = Document::from_pages("book.pdf", InputKind::Pdf, vec![page(10), page(20)]);
        let err = doc
            .detect_orientation(&FakeEngine::default(), &options())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "page 1 of 2: fake engine does not support orientation and script detection"
        );
    }

    #[test]
    fn test_annotate_words_filters_by_confidence() {
        let doc = image_document(12);
        let style = BoxStyle::new(Rgb([255, 0, 0]), 1).unwrap();

        let pages = doc
            .annotate(
                &FakeEngine::default(),
                &options(),
                &AnnotationKind::words(60.0),
                &style,
            )
            .unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].boxes, 1);
        assert_eq!(*pages[0].image.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*pages[0].image.get_pixel(5, 5), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_annotate_characters() {
        let doc = image_document(12);
        let pages = doc
            .annotate(
                &FakeEngine::default(),
                &options(),
                &AnnotationKind::Characters,
                &BoxStyle::default(),
            )
            .unwrap();
        assert_eq!(pages[0].boxes, 1);
    }

    #[test]
    fn test_orientation_error_passes_through() {
        let doc = image_document(12);
        let err = doc
            .detect_orientation(&FakeEngine::default(), &options())
            .unwrap_err();
        assert!(matches!(err, OcrError::Unsupported { .. }));
    }

    #[test]
    fn test_engine_version_defaults_to_unknown() {
        let engine = FakeEngine::default();
        assert_eq!(engine.name(), "fake");
        assert_eq!(engine.version(), None);
    }

    #[test]
    fn test_text_layer_is_skipped_for_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"not decoded").unwrap();
        assert!(text_layer(&path).unwrap().is_none());
    }
}
