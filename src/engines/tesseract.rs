//! Tesseract engine implementation
//!
//! Drives the `tesseract` binary through rusty-tesseract for text, character
//! boxes and word data, and directly for orientation/script detection.
//! Optionally downloads tessdata (training data) on first use.

use crate::config::Config;
use crate::engine::{BoundingBox, CharBox, EngineOptions, OcrEngine, Orientation, Word};
use crate::error::OcrError;
use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

const TESSERACT_BIN: &str = "tesseract";

/// Some traineddata files exceed ureq's default body limit
const MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// TSV level for word rows
const WORD_LEVEL: u32 = 5;

/// Tesseract OCR Engine
pub struct TesseractEngine {
    version: String,
}

impl TesseractEngine {
    /// Check the tesseract binary is usable and make tessdata available
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        if let Some(path) = &config.tessdata_path {
            if !path.is_dir() {
                return Err(OcrError::Initialization(format!(
                    "tessdata directory does not exist: {}",
                    path.display()
                )));
            }
            std::env::set_var("TESSDATA_PREFIX", path);
        } else if config.download_tessdata {
            let mut languages: Vec<&str> = config.effective_language().split('+').collect();
            languages.push("osd");
            let dir = ensure_tessdata_available(&languages)?;
            std::env::set_var("TESSDATA_PREFIX", &dir);
        }

        let output = Command::new(TESSERACT_BIN)
            .arg("--version")
            .output()
            .map_err(|e| {
                OcrError::Initialization(format!(
                    "Failed to run '{}' (is Tesseract installed and on PATH?): {}",
                    TESSERACT_BIN, e
                ))
            })?;

        // Older releases print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        let version = banner.lines().next().unwrap_or("tesseract").trim().to_string();

        tracing::info!(
            "Tesseract engine initialized ({}, language: {})",
            version,
            config.effective_language()
        );

        Ok(Self { version })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - multi-language, word confidences, orientation detection"
    }

    fn version(&self) -> Option<&str> {
        Some(&self.version)
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        options: &EngineOptions,
    ) -> Result<String, OcrError> {
        let (_guard, tess_image) = stage_image(image)?;
        rusty_tesseract::image_to_string(&tess_image, &build_args(options))
            .map_err(|e| OcrError::Processing(format!("Failed to recognize text: {}", e)))
    }

    fn char_boxes(
        &self,
        image: &DynamicImage,
        options: &EngineOptions,
    ) -> Result<Vec<CharBox>, OcrError> {
        let (_guard, tess_image) = stage_image(image)?;
        let boxes = rusty_tesseract::image_to_boxes(&tess_image, &build_args(options))
            .map_err(|e| OcrError::Processing(format!("Failed to get character boxes: {}", e)))?;
        Ok(parse_box_output(&boxes.output, image.height()))
    }

    fn words(
        &self,
        image: &DynamicImage,
        options: &EngineOptions,
    ) -> Result<Vec<Word>, OcrError> {
        let (_guard, tess_image) = stage_image(image)?;
        let data = rusty_tesseract::image_to_data(&tess_image, &build_args(options))
            .map_err(|e| OcrError::Processing(format!("Failed to get word data: {}", e)))?;
        Ok(parse_tsv_words(&data.output))
    }

    fn detect_orientation(
        &self,
        image: &DynamicImage,
        _options: &EngineOptions,
    ) -> Result<Orientation, OcrError> {
        let (guard, _) = stage_image(image)?;

        let output = Command::new(TESSERACT_BIN)
            .arg(guard.path())
            .arg("stdout")
            .args(["--psm", "0", "-l", "osd"])
            .output()
            .map_err(|e| OcrError::Processing(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            return Err(OcrError::Processing(format!(
                "Orientation detection failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_osd(&String::from_utf8_lossy(&output.stdout))
    }

    fn supported_languages(&self) -> Vec<String> {
        match Command::new(TESSERACT_BIN).arg("--list-langs").output() {
            Ok(output) => parse_list_langs(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                tracing::warn!("Failed to list tesseract languages: {}", e);
                Vec::new()
            }
        }
    }
}

/// Write the image to a temporary PNG the tesseract binary can read.
/// The returned file must outlive the `Image`.
fn stage_image(image: &DynamicImage) -> Result<(NamedTempFile, Image), OcrError> {
    let file = tempfile::Builder::new()
        .prefix("ocr-extract-")
        .suffix(".png")
        .tempfile()?;

    image
        .save_with_format(file.path(), image::ImageFormat::Png)
        .map_err(|e| OcrError::Processing(format!("Failed to write temporary image: {}", e)))?;

    tracing::debug!(
        "Staged {}x{} image at {}",
        image.width(),
        image.height(),
        file.path().display()
    );

    let tess_image = Image::from_path(file.path())
        .map_err(|e| OcrError::Processing(format!("Failed to load staged image: {}", e)))?;

    Ok((file, tess_image))
}

fn build_args(options: &EngineOptions) -> Args {
    let mut args = Args {
        lang: options.language.clone(),
        dpi: options.tesseract.dpi.map(|dpi| dpi as i32),
        psm: options.tesseract.psm.map(i32::from),
        oem: options.tesseract.oem.map(i32::from),
        ..Args::default()
    };
    args.config_variables.extend(
        options
            .tesseract
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    args
}

/// Parse `symbol left bottom right top page` lines. Tesseract measures y from
/// the bottom edge, so rows are flipped against the image height.
fn parse_box_output(output: &str, image_height: u32) -> Vec<CharBox> {
    let height = image_height as i32;

    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.rsplitn(6, ' ');
            let _page = fields.next()?;
            let top: i32 = fields.next()?.parse().ok()?;
            let right: i32 = fields.next()?.parse().ok()?;
            let bottom: i32 = fields.next()?.parse().ok()?;
            let left: i32 = fields.next()?.parse().ok()?;
            let symbol = fields.next()?;

            Some(CharBox {
                symbol: symbol.to_string(),
                bbox: BoundingBox::from_corners(left, height - bottom, right, height - top),
            })
        })
        .collect()
}

/// Parse word rows out of tesseract TSV output
fn parse_tsv_words(output: &str) -> Vec<Word> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.splitn(12, '\t').collect();
            if fields.len() < 12 {
                return None;
            }

            let level: u32 = fields[0].parse().ok()?;
            let text = fields[11].trim();
            if level != WORD_LEVEL || text.is_empty() {
                return None;
            }

            let left: i32 = fields[6].parse().ok()?;
            let top: i32 = fields[7].parse().ok()?;
            let width: u32 = fields[8].parse().ok()?;
            let height: u32 = fields[9].parse().ok()?;
            let confidence: f32 = fields[10].parse().ok()?;

            Some(Word {
                text: text.to_string(),
                confidence,
                bbox: BoundingBox::new(left, top, width, height),
            })
        })
        .collect()
}

fn osd_field<'a>(output: &'a str, key: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == key).then(|| value.trim())
    })
}

fn parse_osd(output: &str) -> Result<Orientation, OcrError> {
    let field = |key: &str| osd_field(output, key);

    let rotate = field("Rotate")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| OcrError::Processing(format!("No rotation in OSD output: {}", output)))?;
    let script = field("Script")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OcrError::Processing(format!("No script in OSD output: {}", output)))?;

    Ok(Orientation {
        rotate,
        orientation_degrees: field("Orientation in degrees")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        orientation_confidence: field("Orientation confidence")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0),
        script: script.to_string(),
        script_confidence: field("Script confidence")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0),
    })
}

fn parse_list_langs(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| line.starts_with("List of available languages"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(languages: &[&str]) -> Result<PathBuf, OcrError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocr-extract")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        OcrError::Initialization(format!("Failed to create tessdata directory: {}", e))
    })?;

    for language in languages {
        let traineddata_path = cache_dir.join(format!("{}.traineddata", language));

        if traineddata_path.exists() {
            tracing::debug!("Using cached tessdata {:?}", traineddata_path);
            continue;
        }

        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&tessdata_url(language), &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    }

    Ok(cache_dir)
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::Initialization(format!("Failed to download tessdata: {}", e)))?;

    let mut body = response.into_body();
    let buffer = body
        .with_config()
        .limit(MAX_DOWNLOAD_BYTES)
        .read_to_vec()
        .map_err(|e| {
            OcrError::Initialization(format!("Failed to read tessdata response: {}", e))
        })?;

    // Write next to the target first so an interrupted download never looks cached
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::Initialization(format!("Failed to create tessdata file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        OcrError::Initialization(format!("Failed to write tessdata file: {}", e))
    })?;
    std::fs::rename(&partial, path)?;

    Ok(())
}
