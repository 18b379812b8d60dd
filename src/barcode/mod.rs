//! Reading ISBN barcodes from photographs of book covers

pub mod ean13;
pub mod preprocess;

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use crate::config::ScannerConfig;
use crate::isbn::is_isbn13_barcode;

/// Open an image file and return the ISBN-13 barcodes found in it
pub fn scan_for_isbn(path: &Path, config: &ScannerConfig) -> Result<Vec<String>> {
    let image = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
    Ok(scan_image(&image, config))
}

/// Decode with progressively heavier preprocessing until every symbol
/// found is an ISBN-13, then keep only those.
pub fn scan_image(image: &DynamicImage, config: &ScannerConfig) -> Vec<String> {
    let mut gray = preprocess::to_gray(image);

    if gray.width() > config.max_dimension || gray.height() > config.max_dimension {
        debug!(
            "Shrinking {}x{} image to {:?}",
            gray.width(),
            gray.height(),
            config.first_size
        );
        gray = preprocess::resize_exact(&gray, config.first_size);
    }

    let mut codes = ean13::decode(&gray);

    if !satisfied(&codes) {
        debug!("Retrying scan with contrast x{}", config.contrast_factor);
        gray = preprocess::enhance_contrast(&gray, config.contrast_factor);
        codes = ean13::decode(&gray);
    }

    if !satisfied(&codes) {
        debug!("Retrying scan at {:?}", config.second_size);
        gray = preprocess::resize_exact(&gray, config.second_size);
        codes = ean13::decode(&gray);
    }

    codes.retain(|code| is_isbn13_barcode(code));
    debug!("Scan found {:?}", codes);
    codes
}

fn satisfied(codes: &[String]) -> bool {
    !codes.is_empty() && codes.iter().all(|code| is_isbn13_barcode(code))
}
