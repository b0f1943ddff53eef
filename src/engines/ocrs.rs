//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use crate::config::Config;
use crate::engine::{BoundingBox, CharBox, EngineOptions, OcrEngine, Orientation, Word};
use crate::error::OcrError;
use image::DynamicImage;
use ocrs::{
    DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams, TextItem, TextLine,
};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Models are a few MB each; ureq's default body limit is too small
const MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// ocrs does not score words
const WORD_CONFIDENCE: f32 = 100.0;

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create a new engine, downloading models if needed
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        if config.effective_language() != "eng" {
            tracing::warn!(
                "ocrs only recognizes English/Latin text, ignoring language '{}'",
                config.effective_language()
            );
        }

        let detection_model_path =
            ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::Initialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::Initialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| OcrError::Initialization(format!("Failed to create OCR engine: {}", e)))?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }

    /// Detect, group and recognize every text line in the image
    fn recognize_lines(&self, image: &DynamicImage) -> Result<Vec<TextLine>, OcrError> {
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            OcrError::Processing(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::Processing(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::Processing(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let lines = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::Processing(format!("Failed to recognize text: {}", e)))?;

        Ok(lines.into_iter().flatten().collect())
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        _options: &EngineOptions,
    ) -> Result<String, OcrError> {
        let text = self
            .recognize_lines(image)?
            .iter()
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }

    fn char_boxes(
        &self,
        image: &DynamicImage,
        _options: &EngineOptions,
    ) -> Result<Vec<CharBox>, OcrError> {
        let boxes = self
            .recognize_lines(image)?
            .iter()
            .flat_map(|line| {
                line.chars()
                    .iter()
                    .filter(|c| !c.char.is_whitespace())
                    .map(|c| CharBox {
                        symbol: c.char.to_string(),
                        bbox: BoundingBox::from_corners(
                            c.rect.left(),
                            c.rect.top(),
                            c.rect.right(),
                            c.rect.bottom(),
                        ),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(boxes)
    }

    fn words(
        &self,
        image: &DynamicImage,
        _options: &EngineOptions,
    ) -> Result<Vec<Word>, OcrError> {
        let words = self
            .recognize_lines(image)?
            .iter()
            .flat_map(|line| {
                line.words()
                    .map(|word| {
                        let rect = word.bounding_rect();
                        Word {
                            text: word.to_string(),
                            confidence: WORD_CONFIDENCE,
                            bbox: BoundingBox::from_corners(
                                rect.left(),
                                rect.top(),
                                rect.right(),
                                rect.bottom(),
                            ),
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(words)
    }

    fn detect_orientation(
        &self,
        _image: &DynamicImage,
        _options: &EngineOptions,
    ) -> Result<Orientation, OcrError> {
        Err(OcrError::Unsupported {
            engine: "ocrs",
            operation: "orientation and script detection",
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["eng".to_string()]
    }
}

// ============================================================================
// Model download helpers
// ============================================================================

/// Ensure a model is downloaded and return its path
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, OcrError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocr-extract")
        .join("models");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        OcrError::Initialization(format!("Failed to create model cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if model_path.exists() {
        tracing::debug!("Using cached model {:?}", model_path);
        return Ok(model_path);
    }

    tracing::info!("Downloading {} (this may take a moment)...", filename);

    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::Initialization(format!("Failed to download model: {}", e)))?;

    let mut body = response.into_body();
    let buffer = body
        .with_config()
        .limit(MAX_DOWNLOAD_BYTES)
        .read_to_vec()
        .map_err(|e| OcrError::Initialization(format!("Failed to read model response: {}", e)))?;

    let partial = model_path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::Initialization(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer)
        .map_err(|e| OcrError::Initialization(format!("Failed to write model file: {}", e)))?;
    std::fs::rename(&partial, &model_path)?;

    tracing::info!("Downloaded {} to {:?}", filename, model_path);

    Ok(model_path)
}
