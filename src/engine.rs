use crate::config::{Config, TesseractConfig};
use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;

/// Axis-aligned box in image coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a box from its two corners, in any order
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            left: x1.min(x2),
            top: y1.min(y2),
            width: x1.abs_diff(x2),
            height: y1.abs_diff(y2),
        }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height as i32
    }
}

/// A single recognized character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharBox {
    pub symbol: String,
    pub bbox: BoundingBox,
}

/// A recognized word with its confidence (0-100, -1 when the engine gives none)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Orientation and script detection result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Orientation {
    /// Degrees the page must be rotated to be upright
    pub rotate: u32,
    pub orientation_degrees: u32,
    pub orientation_confidence: f32,
    pub script: String,
    pub script_confidence: f32,
}

/// Per-call options handed to an engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub language: String,
    pub tesseract: TesseractConfig,
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            language: config.effective_language().to_string(),
            tesseract: config.tesseract.clone(),
        }
    }
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract", "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Version reported by the underlying library or binary, when known
    fn version(&self) -> Option<&str> {
        None
    }

    /// Extract plain text from an image
    fn recognize(&self, image: &DynamicImage, options: &EngineOptions)
        -> Result<String, OcrError>;

    /// Boxes around every recognized character
    fn char_boxes(
        &self,
        image: &DynamicImage,
        options: &EngineOptions,
    ) -> Result<Vec<CharBox>, OcrError>;

    /// Word-level results with confidences
    fn words(&self, image: &DynamicImage, options: &EngineOptions)
        -> Result<Vec<Word>, OcrError>;

    /// Orientation and script detection
    fn detect_orientation(
        &self,
        image: &DynamicImage,
        options: &EngineOptions,
    ) -> Result<Orientation, OcrError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}
