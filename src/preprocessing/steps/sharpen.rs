use image::DynamicImage;
use imageproc::filter::filter3x3;

/// Laplacian sharpening kernel: centre 5, edge neighbours -1
const KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

pub fn apply(image: DynamicImage) -> DynamicImage {
    let gray = image.into_luma8();
    DynamicImage::ImageLuma8(filter3x3(&gray, &KERNEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_sharpen_increases_edge_contrast() {
        let img = GrayImage::from_fn(12, 6, |x, _| if x < 6 { Luma([90]) } else { Luma([160]) });
        let result = apply(DynamicImage::ImageLuma8(img)).to_luma8();

        let dark_side = result.get_pixel(5, 3).0[0];
        let light_side = result.get_pixel(6, 3).0[0];
        assert!(dark_side < 90, "dark side should darken, got {}", dark_side);
        assert!(light_side > 160, "light side should lighten, got {}", light_side);
    }

    #[test]
    fn test_sharpen_leaves_flat_areas() {
        let img = GrayImage::from_pixel(5, 5, Luma([120]));
        let result = apply(DynamicImage::ImageLuma8(img)).to_luma8();
        assert_eq!(result.get_pixel(2, 2).0[0], 120);
    }
}
