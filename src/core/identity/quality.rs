// src/core/identity/quality.rs
//! Document image quality gate.
//!
//! Sharpness is the population variance of the 3x3 Laplacian
//! (`[0 1 0; 1 -4 1; 0 1 0]`) over the grayscale image, borders mirrored
//! without repeating the edge pixel. Blurry scans have little high-frequency
//! energy and therefore a low variance.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageReader, Luma};
use tracing::debug;

use crate::utils::error::{IdGateError, Result};

#[derive(Debug, Clone)]
pub struct DocumentImage {
    pub pixels: GrayImage,
    pub sharpness: f64,
}

impl DocumentImage {
    pub fn load(path: &Path) -> Result<Self> {
        // Artifacts may lack an extension, so sniff the format from content.
        let decoded = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode());
        let image = decoded.map_err(|e| {
            debug!("Failed to decode {}: {}", path.display(), e);
            IdGateError::FailedToLoadImage
        })?;
        Ok(Self::from_dynamic(&image))
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_gray(grayscale(image))
    }

    pub fn from_gray(pixels: GrayImage) -> Self {
        let sharpness = laplacian_variance(&pixels);
        Self { pixels, sharpness }
    }
}

/// Luma with BT.601 weights, as used by most OCR preprocessing.
pub fn grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }
    gray
}

fn reflect(index: i64, len: i64) -> u32 {
    if len == 1 {
        return 0;
    }
    let mirrored = if index < 0 {
        -index
    } else if index >= len {
        2 * len - 2 - index
    } else {
        index
    };
    mirrored as u32
}

pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let count = width as u64 * height as u64;
    if count == 0 {
        return 0.0;
    }

    let (w, h) = (width as i64, height as i64);
    let at = |x: i64, y: i64| gray.get_pixel(reflect(x, w), reflect(y, h)).0[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let response = at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1)
                - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    pub min_sharpness: f64,
}

impl QualityGate {
    pub fn new(min_sharpness: f64) -> Self {
        Self { min_sharpness }
    }

    pub fn check(&self, image: &DocumentImage) -> Result<()> {
        if image.sharpness < self.min_sharpness {
            debug!(
                sharpness = image.sharpness,
                minimum = self.min_sharpness,
                "Document image rejected as blurry"
            );
            return Err(IdGateError::LowQualityImage);
        }
        Ok(())
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(100.0)
    }
}
