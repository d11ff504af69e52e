//! Grayscale pixel operations shared by the preprocessing profiles.

use image::{GrayImage, Luma, imageops};

/// Standard sharpening kernel, center-weighted.
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Percentile bounds for histogram normalization.
const NORMALIZE_LOWER_PERCENTILE: f64 = 0.01;
const NORMALIZE_UPPER_PERCENTILE: f64 = 0.99;

/// Mean and standard deviation of pixel intensity.
pub fn intensity_stats(img: &GrayImage) -> (f32, f32) {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for pixel in img.pixels() {
        let value = pixel.0[0] as f64;
        sum += value;
        sum_sq += value * value;
        count += 1;
    }

    if count == 0 {
        return (0.0, 0.0);
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    (mean as f32, variance.max(0.0).sqrt() as f32)
}

/// Stretches the intensity range so the 1st..99th percentile band maps onto
/// the full 0..255 range. Flat images with no usable band come back
/// unchanged.
pub fn normalize_levels(img: &GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return img.clone();
    }

    let lower_cutoff = (total as f64 * NORMALIZE_LOWER_PERCENTILE) as u64;
    let upper_cutoff = (total as f64 * NORMALIZE_UPPER_PERCENTILE) as u64;

    let mut cumulative = 0u64;
    let mut low = 0u8;
    for (value, count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative > lower_cutoff {
            low = value as u8;
            break;
        }
    }

    cumulative = 0;
    let mut high = 255u8;
    for (value, count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= upper_cutoff {
            high = value as u8;
            break;
        }
    }

    if high <= low {
        return img.clone();
    }

    let scale = 255.0 / (high - low) as f32;
    map_pixels(img, |value| {
        ((value as f32 - low as f32) * scale).clamp(0.0, 255.0) as u8
    })
}

/// Linear intensity stretch: `out = slope * in + offset`, clamped.
pub fn linear_stretch(img: &GrayImage, slope: f32, offset: f32) -> GrayImage {
    map_pixels(img, |value| {
        (value as f32 * slope + offset).clamp(0.0, 255.0) as u8
    })
}

/// Binarizes the image: pixels at or above the threshold become white,
/// the rest black.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    map_pixels(img, |value| if value >= threshold { 255 } else { 0 })
}

/// Applies a 3x3 sharpening convolution.
pub fn sharpen(img: &GrayImage) -> GrayImage {
    imageops::filter3x3(img, &SHARPEN_KERNEL)
}

fn map_pixels(img: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        out.put_pixel(x, y, Luma([f(pixel.0[0])]));
    }
    out
}
