use image::{DynamicImage, GrayImage, Luma};

/// Side of the square neighbourhood each threshold is computed over
const WINDOW: u32 = 15;
/// Sensitivity to local contrast
const K: f64 = 0.2;
/// Dynamic range of the standard deviation for 8-bit images
const R: f64 = 128.0;

/// Sauvola adaptive binarization, robust to uneven lighting
pub fn apply(image: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(sauvola(&image.into_luma8(), WINDOW, K))
}

/// Summed-area tables of values and squared values, (w+1) x (h+1), row-major
struct Integrals {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integrals {
    fn new(img: &GrayImage) -> Self {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1)];
        let mut sum_sq = vec![0.0; stride * (height + 1)];

        for y in 0..height {
            let mut row_sum = 0.0;
            let mut row_sum_sq = 0.0;
            for x in 0..width {
                let v = img.get_pixel(x as u32, y as u32).0[0] as f64;
                row_sum += v;
                row_sum_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row_sum;
                sum_sq[at] = sum_sq[at - stride] + row_sum_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// Mean and standard deviation over the inclusive window [x1, x2] x [y1, y2]
    fn stats(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> (f64, f64) {
        let rect = |table: &[f64]| {
            let (a, b) = (y1 * self.stride + x1, y1 * self.stride + x2 + 1);
            let (c, d) = ((y2 + 1) * self.stride + x1, (y2 + 1) * self.stride + x2 + 1);
            table[d] - table[b] - table[c] + table[a]
        };

        let area = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f64;
        let mean = rect(&self.sum) / area;
        let variance = rect(&self.sum_sq) / area - mean * mean;
        (mean, variance.max(0.0).sqrt())
    }
}

/// threshold = mean * (1 + k * (std_dev / R - 1))
fn sauvola(img: &GrayImage, window: u32, k: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let half = window / 2;
    let integrals = Integrals::new(img);

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = x.saturating_sub(half) as usize;
        let y1 = y.saturating_sub(half) as usize;
        let x2 = (x + half).min(width - 1) as usize;
        let y2 = (y + half).min(height - 1) as usize;

        let (mean, std_dev) = integrals.stats(x1, y1, x2, y2);
        let threshold = mean * (1.0 + k * (std_dev / R - 1.0));

        if img.get_pixel(x, y).0[0] as f64 > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
