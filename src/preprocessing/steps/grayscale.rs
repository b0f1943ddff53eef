use image::DynamicImage;

/// Collapse to a single luma channel. Already-gray images pass through.
pub fn apply(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}
