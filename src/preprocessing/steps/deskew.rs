use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Search range either side of level, in degrees
const MAX_SKEW_DEGREES: f32 = 5.0;
const COARSE_STEP_DEGREES: f32 = 0.5;
const FINE_STEP_DEGREES: f32 = 0.1;
/// Rotations smaller than this are not worth the resampling
const MIN_CORRECTION_DEGREES: f32 = 0.1;
/// Pixels darker than this count as ink
const INK_LEVEL: u8 = 128;

/// Straighten slightly rotated scans using the projection-profile method
pub fn apply(image: DynamicImage) -> DynamicImage {
    let gray = image.into_luma8();
    let skew = estimate_skew_degrees(&gray);

    if skew.abs() < MIN_CORRECTION_DEGREES {
        return DynamicImage::ImageLuma8(gray);
    }

    tracing::debug!("Correcting {:.1} degree skew", skew);
    // rotate_about_center turns clockwise; a positive skew already leans clockwise
    let rotated = rotate_about_center(
        &gray,
        -skew.to_radians(),
        Interpolation::Bilinear,
        Luma([255u8]),
    );
    DynamicImage::ImageLuma8(rotated)
}

/// Angle whose row projection is sharpest: coarse sweep, then a fine one
fn estimate_skew_degrees(img: &GrayImage) -> f32 {
    let ink = ink_pixels(img);
    if ink.is_empty() {
        return 0.0;
    }

    let coarse = sweep(
        &ink,
        img.height(),
        -MAX_SKEW_DEGREES,
        MAX_SKEW_DEGREES,
        COARSE_STEP_DEGREES,
    );
    sweep(
        &ink,
        img.height(),
        coarse - COARSE_STEP_DEGREES,
        coarse + COARSE_STEP_DEGREES,
        FINE_STEP_DEGREES,
    )
}

/// Dark pixel coordinates relative to the image centre
fn ink_pixels(img: &GrayImage) -> Vec<(f32, f32)> {
    let cx = img.width() as f32 / 2.0;
    let cy = img.height() as f32 / 2.0;

    img.enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] < INK_LEVEL)
        .map(|(x, y, _)| (x as f32 - cx, y as f32 - cy))
        .collect()
}

fn sweep(ink: &[(f32, f32)], height: u32, from: f32, to: f32, step: f32) -> f32 {
    let steps = ((to - from) / step).round() as i32;

    let mut best = (0.0_f32, f32::MIN);
    for i in 0..=steps {
        let angle = from + i as f32 * step;
        let score = profile_variance(ink, height, angle.to_radians());
        // Prefer the angle closest to level on ties
        if score > best.1 || (score == best.1 && angle.abs() < best.0.abs()) {
            best = (angle, score);
        }
    }
    best.0
}

/// Variance of ink counts per row after rotating by `angle`
fn profile_variance(ink: &[(f32, f32)], height: u32, angle: f32) -> f32 {
    let (sin, cos) = angle.sin_cos();
    let cy = height as f32 / 2.0;
    let mut rows = vec![0u32; height as usize];

    for &(dx, dy) in ink {
        let row = (dy * cos - dx * sin + cy) as i64;
        if (0..height as i64).contains(&row) {
            rows[row as usize] += 1;
        }
    }

    let n = rows.len() as f32;
    let mean = rows.iter().sum::<u32>() as f32 / n;
    rows.iter().map(|&c| (c as f32 - mean).powi(2)).sum::<f32>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruled_page(angle_degrees: f32) -> GrayImage {
        let mut img = GrayImage::from_pixel(200, 120, Luma([255]));
        let slope = angle_degrees.to_radians().tan();
        for line in [30.0_f32, 60.0, 90.0] {
            for x in 20..180 {
                let y = line + (x as f32 - 100.0) * slope;
                img.put_pixel(x, y.round() as u32, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn test_level_lines_have_no_skew() {
        let skew = estimate_skew_degrees(&ruled_page(0.0));
        assert!(skew.abs() < 0.3, "expected ~0, got {}", skew);
    }

    #[test]
    fn test_detects_tilted_lines() {
        let skew = estimate_skew_degrees(&ruled_page(3.0));
        assert!((skew.abs() - 3.0).abs() < 0.6, "expected ~3 degrees, got {}", skew);
    }

    #[test]
    fn test_apply_levels_tilted_lines() {
        let corrected = apply(DynamicImage::ImageLuma8(ruled_page(3.0))).into_luma8();
        let skew = estimate_skew_degrees(&corrected);
        assert!(skew.abs() < 0.6, "expected ~0 after correction, got {}", skew);
    }

    #[test]
    fn test_blank_page_is_untouched() {
        let img = GrayImage::from_pixel(50, 20, Luma([255]));
        let result = apply(DynamicImage::ImageLuma8(img.clone())).into_luma8();
        assert_eq!(result, img);
    }
}
