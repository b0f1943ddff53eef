//! Stroke thickening and thinning, on the light (non-zero) pixels

use image::DynamicImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Radius of the square structuring element
const RADIUS: u8 = 1;

pub fn dilate(image: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(morphology::dilate(&image.into_luma8(), Norm::LInf, RADIUS))
}

pub fn erode(image: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(morphology::erode(&image.into_luma8(), Norm::LInf, RADIUS))
}

/// Erosion followed by dilation; clears specks smaller than the element
pub fn opening(image: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(morphology::open(&image.into_luma8(), Norm::LInf, RADIUS))
}
