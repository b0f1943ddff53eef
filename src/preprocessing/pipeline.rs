use crate::error::OcrError;
use clap::ValueEnum;
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

use super::steps::Step;

/// Preprocessing preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    /// Skip all preprocessing
    #[default]
    None,
    /// Clean scans: grayscale only
    Minimal,
    /// Balanced: grayscale, resize, normalize, sharpen
    Default,
    /// Poor quality images: grayscale, resize, denoise, normalize, sharpen, deskew, threshold
    Aggressive,
}

impl Preset {
    /// Get the preset name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Default => "default",
            Self::Aggressive => "aggressive",
        }
    }

    /// Steps the preset expands to
    pub fn steps(&self) -> Vec<Step> {
        match self {
            Self::None => vec![],
            Self::Minimal => vec![Step::Grayscale],
            Self::Default => vec![Step::Grayscale, Step::Resize, Step::Normalize, Step::Sharpen],
            Self::Aggressive => vec![
                Step::Grayscale,
                Step::Resize,
                Step::Denoise,
                Step::Normalize,
                Step::Sharpen,
                Step::Deskew,
                Step::Threshold,
            ],
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Ordered list of steps applied to every image before OCR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self::new(preset.steps())
    }

    /// Parse a comma-separated list such as `grayscale,threshold`
    pub fn parse(list: &str) -> Result<Self, OcrError> {
        let steps = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse::<Step>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(steps))
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::Preprocessing(format!(
                "cannot preprocess an empty {}x{} image",
                image.width(),
                image.height()
            )));
        }

        let start = Instant::now();
        let mut timings = Vec::with_capacity(self.steps.len());
        let mut img = image;

        for step in &self.steps {
            let step_start = Instant::now();
            img = step.apply(img);
            timings.push(StepTiming {
                name: step.name().to_string(),
                time_ms: step_start.elapsed().as_millis() as u64,
            });
        }

        let result = PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        };

        if !self.steps.is_empty() {
            tracing::debug!(
                "Preprocessing took {}ms: {:?}",
                result.total_time_ms,
                result.steps
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_parse_keeps_order_and_repeats() {
        let pipeline = Pipeline::parse("grayscale, threshold,dilate,threshold").unwrap();
        assert_eq!(
            pipeline.steps(),
            &[Step::Grayscale, Step::Threshold, Step::Dilate, Step::Threshold]
        );
    }

    #[test]
    fn test_parse_rejects_unknown_step() {
        let err = Pipeline::parse("grayscale,blur").unwrap_err();
        match err {
            OcrError::InvalidPreprocess { name, available } => {
                assert_eq!(name, "blur");
                assert!(available.starts_with("grayscale, resize"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_pipeline_returns_image_unchanged() {
        let img = RgbImage::from_pixel(5, 4, Rgb([10, 200, 30]));
        let result = Pipeline::parse("")
            .unwrap()
            .process(DynamicImage::ImageRgb8(img.clone()))
            .unwrap();

        assert!(result.steps.is_empty());
        assert_eq!(result.image.as_rgb8(), Some(&img));
    }

    #[test]
    fn test_process_records_each_step() {
        let img = GrayImage::from_pixel(20, 20, Luma([180]));
        let result = Pipeline::from_preset(Preset::Aggressive)
            .process(DynamicImage::ImageLuma8(img))
            .unwrap();

        let names: Vec<_> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["grayscale", "resize", "denoise", "normalize", "sharpen", "deskew", "threshold"]
        );
        assert!(result.image.as_luma8().is_some());
    }

    #[test]
    fn test_preset_expansion() {
        assert!(Pipeline::from_preset(Preset::None).is_empty());
        assert_eq!(Preset::Minimal.steps(), vec![Step::Grayscale]);
        assert_eq!(Preset::Default.as_str(), "default");
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let result = Pipeline::from_preset(Preset::Minimal)
            .process(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        assert!(matches!(result, Err(OcrError::Preprocessing(_))));
    }
}
