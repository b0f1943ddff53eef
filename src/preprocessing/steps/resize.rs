use image::{imageops::FilterType, DynamicImage};

/// Tesseract does best around 300 DPI; inputs are assumed to be 72 DPI
const SCALE: f32 = 300.0 / 72.0;
/// Longest side allowed after scaling
const MAX_DIMENSION: u32 = 4000;
/// Shortest side wanted after scaling
const MIN_DIMENSION: u32 = 300;

/// Rescale towards a resolution the OCR engine handles well
pub fn apply(image: DynamicImage) -> DynamicImage {
    match target_size(image.width(), image.height()) {
        Some((width, height)) => image.resize_exact(width, height, FilterType::Lanczos3),
        None => image,
    }
}

/// New size for an image, or `None` when it is already within 5%
fn target_size(width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }

    let mut scale = SCALE;

    let longest = width.max(height) as f32 * scale;
    if longest < MIN_DIMENSION as f32 {
        let shortest = width.min(height) as f32 * scale;
        scale *= MIN_DIMENSION as f32 / shortest;
    }

    // The cap wins over the minimum
    let longest = width.max(height) as f32 * scale;
    if longest > MAX_DIMENSION as f32 {
        scale *= MAX_DIMENSION as f32 / longest;
    }

    if (0.95..=1.05).contains(&scale) {
        return None;
    }

    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);
    Some((new_width, new_height))
}
