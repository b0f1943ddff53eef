use image::{DynamicImage, GrayImage};

/// Stretch the histogram so the darkest pixel becomes 0 and the lightest 255
pub fn apply(image: DynamicImage) -> DynamicImage {
    let mut gray = image.into_luma8();
    stretch(&mut gray);
    DynamicImage::ImageLuma8(gray)
}

fn stretch(img: &mut GrayImage) {
    let (low, high) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(low, high), p| (low.min(p.0[0]), high.max(p.0[0])));

    if high <= low {
        return;
    }

    let range = (high - low) as u32;
    let lut: Vec<u8> = (0..=255u32)
        .map(|v| (v.saturating_sub(low as u32).min(range) * 255 / range) as u8)
        .collect();

    for pixel in img.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
}
