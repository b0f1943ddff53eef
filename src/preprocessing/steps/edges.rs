use image::DynamicImage;
use imageproc::edges;

/// Hysteresis thresholds, the usual 100/200 pair
const LOW_THRESHOLD: f32 = 100.0;
const HIGH_THRESHOLD: f32 = 200.0;

/// Canny edge map: white edges on black
pub fn canny(image: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(edges::canny(
        &image.into_luma8(),
        LOW_THRESHOLD,
        HIGH_THRESHOLD,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_canny_marks_step_edge_only() {
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([0]) } else { Luma([255]) });
        let result = canny(DynamicImage::ImageLuma8(img)).into_luma8();

        assert!(result.pixels().any(|p| p.0[0] == 255));
        assert_eq!(result.get_pixel(2, 10).0[0], 0);
        assert_eq!(result.get_pixel(17, 10).0[0], 0);
    }
}
