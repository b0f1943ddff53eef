//! Individual preprocessing steps

pub mod denoise;
pub mod deskew;
pub mod edges;
pub mod grayscale;
pub mod morphology;
pub mod normalize;
pub mod resize;
pub mod sharpen;
pub mod threshold;

use crate::error::OcrError;
use image::DynamicImage;
use std::fmt;
use std::str::FromStr;

/// A named image transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Grayscale,
    Resize,
    Denoise,
    Normalize,
    Sharpen,
    Deskew,
    Threshold,
    Dilate,
    Erode,
    Opening,
    Canny,
}

impl Step {
    /// Every step, in the order they are listed to users
    pub fn all() -> &'static [Step] {
        &[
            Step::Grayscale,
            Step::Resize,
            Step::Denoise,
            Step::Normalize,
            Step::Sharpen,
            Step::Deskew,
            Step::Threshold,
            Step::Dilate,
            Step::Erode,
            Step::Opening,
            Step::Canny,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Grayscale => "grayscale",
            Step::Resize => "resize",
            Step::Denoise => "denoise",
            Step::Normalize => "normalize",
            Step::Sharpen => "sharpen",
            Step::Deskew => "deskew",
            Step::Threshold => "threshold",
            Step::Dilate => "dilate",
            Step::Erode => "erode",
            Step::Opening => "opening",
            Step::Canny => "canny",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Step::Grayscale => "convert to a single gray channel",
            Step::Resize => "rescale towards ~300 DPI, capped at 4000px",
            Step::Denoise => "3x3 median filter against salt-and-pepper noise",
            Step::Normalize => "stretch contrast to the full 0-255 range",
            Step::Sharpen => "Laplacian edge sharpening",
            Step::Deskew => "straighten text tilted by up to 5 degrees",
            Step::Threshold => "Sauvola adaptive binarization",
            Step::Dilate => "grow light regions by one pixel",
            Step::Erode => "shrink light regions by one pixel",
            Step::Opening => "erode then dilate, removing small specks",
            Step::Canny => "Canny edge detection",
        }
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match self {
            Step::Grayscale => grayscale::apply(image),
            Step::Resize => resize::apply(image),
            Step::Denoise => denoise::apply(image),
            Step::Normalize => normalize::apply(image),
            Step::Sharpen => sharpen::apply(image),
            Step::Deskew => deskew::apply(image),
            Step::Threshold => threshold::apply(image),
            Step::Dilate => morphology::dilate(image),
            Step::Erode => morphology::erode(image),
            Step::Opening => morphology::opening(image),
            Step::Canny => edges::canny(image),
        }
    }
}

impl FromStr for Step {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Step::all()
            .iter()
            .copied()
            .find(|step| step.name() == wanted)
            .ok_or_else(|| OcrError::InvalidPreprocess {
                name: s.trim().to_string(),
                available: Step::all()
                    .iter()
                    .map(Step::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
