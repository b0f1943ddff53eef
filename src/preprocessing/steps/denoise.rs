use image::DynamicImage;
use imageproc::filter::median_filter;

/// 3x3 median filter; removes salt-and-pepper specks without blurring strokes
pub fn apply(image: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(median_filter(&image.into_luma8(), 1, 1))
}
