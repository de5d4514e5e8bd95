//! Average hash (aHash) implementation.
//!
//! 1. Shrink the image to hash_size x hash_size grayscale
//! 2. Compute the mean brightness
//! 3. One bit per pixel: brighter than the mean = 1
//!
//! The least discriminating fingerprint; the broad similarity layer uses it
//! with a loose threshold.

use super::super::resize::reduce_to_gray;
use super::super::traits::{pack_bits, Fingerprint, FingerprintAlgorithm, FingerprintKind};
use crate::error::HashError;
use image::DynamicImage;

/// Average hash (aHash)
pub struct AverageHasher {
    hash_size: u32,
}

impl AverageHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }
}

impl FingerprintAlgorithm for AverageHasher {
    fn compute(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let gray = reduce_to_gray(image, self.hash_size, self.hash_size)?;

        let total: u64 = gray.pixels().map(|p| p[0] as u64).sum();
        let mean = (total / (self.hash_size * self.hash_size) as u64) as u8;

        let bits = pack_bits(gray.pixels().map(|p| p[0] > mean));
        Ok(Fingerprint::new(bits, FingerprintKind::Average))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Average
    }
}
