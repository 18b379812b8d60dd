//! Image conditioning applied before each decode attempt

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

pub fn to_gray(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Resize to exactly `(width, height)`, ignoring aspect ratio
pub fn resize_exact(image: &GrayImage, (width, height): (u32, u32)) -> GrayImage {
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Push every pixel away from the mean luminance by `factor`.
///
/// A factor of 1.0 leaves the image unchanged, 0.0 gives a flat grey.
pub fn enhance_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let pixel_count = (image.width() as u64 * image.height() as u64).max(1);
    let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (sum as f32 / pixel_count as f32).round();

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y).0[0] as f32;
        let stretched = mean + factor * (value - mean);
        Luma([stretched.round().clamp(0.0, 255.0) as u8])
    })
}
