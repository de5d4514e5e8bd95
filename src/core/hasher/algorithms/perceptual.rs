//! DCT-style perceptual hash (pHash) implementation.
//!
//! The near-exact layer needs a high-resolution fingerprint that survives
//! re-encodes and re-saves while staying tight enough to separate genuinely
//! different images at a distance of 2. We use the image_hasher crate's
//! well-tested gradient-DCT algorithm at 16x16 (256 bits).

use super::super::traits::{Fingerprint, FingerprintAlgorithm, FingerprintKind};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

/// DCT-style perceptual hash (pHash)
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    pub fn new(hash_size: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::DoubleGradient)
            .to_hasher();

        Self { hasher }
    }
}

impl FingerprintAlgorithm for PerceptualHasher {
    fn compute(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let hash = self.hasher.hash_image(image);
        Ok(Fingerprint::new(
            hash.as_bytes().to_vec(),
            FingerprintKind::Perceptual,
        ))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Perceptual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient_image(offset: u8) -> DynamicImage {
        let img = ImageBuffer::from_fn(100, 100, |x, y| {
            let v = ((x + y) * 255 / 198) as u8;
            Rgb([
                v.saturating_add(offset),
                v.saturating_add(offset),
                v.saturating_add(offset),
            ])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn identical_images_produce_identical_fingerprints() {
        let hasher = PerceptualHasher::new(16);
        let image = gradient_image(0);

        let a = hasher.compute(&image).unwrap();
        let b = hasher.compute(&image).unwrap();

        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn brightness_shift_stays_close() {
        let hasher = PerceptualHasher::new(16);

        let a = hasher.compute(&gradient_image(0)).unwrap();
        let b = hasher.compute(&gradient_image(5)).unwrap();

        assert!(
            a.distance(&b) <= 8,
            "small brightness shift should stay close, distance was {}",
            a.distance(&b)
        );
    }

    #[test]
    fn kind_is_perceptual() {
        assert_eq!(
            PerceptualHasher::new(16).kind(),
            FingerprintKind::Perceptual
        );
    }
}
