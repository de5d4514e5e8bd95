//! # Quality Module
//!
//! Retention scoring for keeper selection.
//!
//! The score is a composite total order, highest priority first:
//! 1. non-degraded beats degraded (pixels could not be reloaded)
//! 2. larger pixel area
//! 3. higher sharpness (Laplacian variance of the grayscale image)
//! 4. larger external content signal, when a provider is configured
//! 5. larger byte size (less compression loss)
//!
//! The final lexicographic-path tie-break lives in the planner, which holds
//! both paths.

use crate::core::hasher::decode;
use crate::core::scanner::ImageRecord;
use crate::error::ScoreError;
use image::{DynamicImage, GrayImage};
use std::cmp::Ordering;
use std::path::Path;

/// Opaque external content signal, e.g. an object detector's count or
/// confidence for an image. Consumed as-is; absence is tolerated.
pub trait ContentSignalProvider: Send + Sync {
    fn signal_for(&self, path: &Path) -> Option<f64>;
}

/// The provider used when no external signal is configured.
pub struct NoSignal;

impl ContentSignalProvider for NoSignal {
    fn signal_for(&self, _path: &Path) -> Option<f64> {
        None
    }
}

/// Comparable retention quality for one record
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionScore {
    /// Pixels could not be reloaded; always loses to a non-degraded score
    pub degraded: bool,
    /// Total pixel count
    pub pixel_area: u64,
    /// Laplacian variance; higher is sharper
    pub sharpness: f64,
    /// External content signal, if a provider supplied one
    pub signal: Option<f64>,
    /// File size in bytes
    pub byte_size: u64,
}

impl RetentionScore {
    /// Total order over scores; `Greater` means "better to keep".
    pub fn cmp_quality(&self, other: &Self) -> Ordering {
        // bool ordering is false < true, so comparing the *other* record's
        // degraded flag first makes the non-degraded record greater
        other
            .degraded
            .cmp(&self.degraded)
            .then(self.pixel_area.cmp(&other.pixel_area))
            .then(self.sharpness.total_cmp(&other.sharpness))
            .then(cmp_signal(self.signal, other.signal))
            .then(self.byte_size.cmp(&other.byte_size))
    }
}

fn cmp_signal(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Computes retention scores from pixel data
pub struct QualityAnalyzer {
    /// Size images are reduced to before sharpness analysis
    analysis_size: u32,
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        Self { analysis_size: 512 }
    }
}

impl QualityAnalyzer {
    pub fn new(analysis_size: u32) -> Self {
        Self { analysis_size }
    }

    /// Score a record, reloading its pixels.
    ///
    /// On decode failure the record is scored degraded (always loses ties)
    /// and the error is returned alongside for reporting; never fatal.
    pub fn score_record(
        &self,
        record: &ImageRecord,
        signal: Option<f64>,
    ) -> (RetentionScore, Option<ScoreError>) {
        match decode(record.path()) {
            Ok(image) => (
                RetentionScore {
                    degraded: false,
                    pixel_area: record.pixel_area(),
                    sharpness: self.sharpness(&image),
                    signal,
                    byte_size: record.byte_size(),
                },
                None,
            ),
            Err(e) => (
                RetentionScore {
                    degraded: true,
                    pixel_area: record.pixel_area(),
                    sharpness: 0.0,
                    signal,
                    byte_size: record.byte_size(),
                },
                Some(ScoreError::Fallback {
                    path: record.path().to_path_buf(),
                    reason: e.to_string(),
                }),
            ),
        }
    }

    /// Sharpness of a decoded image: Laplacian variance of its reduced
    /// grayscale form. Deterministic for a given image.
    pub fn sharpness(&self, image: &DynamicImage) -> f64 {
        let resized = image.resize(
            self.analysis_size,
            self.analysis_size,
            image::imageops::FilterType::Triangle,
        );
        laplacian_variance(&resized.to_luma8())
    }
}

/// Variance of the Laplacian response. Sharp images have well-defined edges
/// and therefore high variance; blurred copies score lower.
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();

    if width < 3 || height < 3 {
        return 0.0;
    }

    // Kernel: [0, 1, 0; 1, -4, 1; 0, 1, 0]
    let mut responses: Vec<f64> = Vec::with_capacity((width * height) as usize);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get_pixel(x, y)[0] as f64;
            let top = gray.get_pixel(x, y - 1)[0] as f64;
            let bottom = gray.get_pixel(x, y + 1)[0] as f64;
            let left = gray.get_pixel(x - 1, y)[0] as f64;
            let right = gray.get_pixel(x + 1, y)[0] as f64;

            responses.push(top + bottom + left + right - 4.0 * center);
        }
    }

    if responses.is_empty() {
        return 0.0;
    }

    let n = responses.len() as f64;
    let mean = responses.iter().sum::<f64>() / n;
    responses.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
}
