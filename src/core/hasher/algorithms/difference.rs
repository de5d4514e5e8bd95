//! Difference hash (dHash) implementation.
//!
//! 1. Shrink the image to (hash_size + 1) x hash_size grayscale - one extra
//!    column so every cell has a right-hand neighbour
//! 2. One bit per cell: left pixel brighter than its right neighbour = 1
//!
//! Captures the horizontal brightness gradient, which survives crops and
//! minor edits; the structural layer uses it at a medium threshold.

use super::super::resize::reduce_to_gray;
use super::super::traits::{pack_bits, Fingerprint, FingerprintAlgorithm, FingerprintKind};
use crate::error::HashError;
use image::DynamicImage;

/// Difference hash (dHash)
pub struct DifferenceHasher {
    hash_size: u32,
}

impl DifferenceHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }
}

impl FingerprintAlgorithm for DifferenceHasher {
    fn compute(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let gray = reduce_to_gray(image, self.hash_size + 1, self.hash_size)?;

        let size = self.hash_size;
        let bits = pack_bits((0..size).flat_map(|y| {
            let gray = &gray;
            (0..size).map(move |x| gray.get_pixel(x, y)[0] > gray.get_pixel(x + 1, y)[0])
        }));

        Ok(Fingerprint::new(bits, FingerprintKind::Difference))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Difference
    }
}
