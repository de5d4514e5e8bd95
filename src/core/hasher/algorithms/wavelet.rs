//! Haar wavelet hash (wHash) implementation.
//!
//! 1. Shrink the image to (hash_size << LEVELS) square grayscale
//! 2. Run LEVELS passes of the 2D Haar transform, keeping only the
//!    low-frequency approximation band each pass (a 2x2 mean), ending at a
//!    hash_size x hash_size band
//! 3. One bit per coefficient: above the band's median = 1
//!
//! Discarding the detail bands makes the fingerprint robust to compression
//! artifacts and resizing; the wavelet layer uses it at a medium threshold.

use super::super::resize::reduce_to_gray;
use super::super::traits::{pack_bits, Fingerprint, FingerprintAlgorithm, FingerprintKind};
use crate::error::HashError;
use image::DynamicImage;

/// Haar decomposition depth: 8x8 hash reads a 64x64 reduction
const LEVELS: u32 = 3;

/// Haar wavelet hash (wHash)
pub struct WaveletHasher {
    hash_size: u32,
}

impl WaveletHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }

    /// One Haar level: collapse each 2x2 block to its mean, halving both
    /// dimensions. Equivalent to keeping the LL band and dropping the
    /// detail coefficients.
    fn approximation(band: &[f64], side: usize) -> Vec<f64> {
        let half = side / 2;
        let mut next = vec![0.0; half * half];

        for y in 0..half {
            for x in 0..half {
                let a = band[(2 * y) * side + 2 * x];
                let b = band[(2 * y) * side + 2 * x + 1];
                let c = band[(2 * y + 1) * side + 2 * x];
                let d = band[(2 * y + 1) * side + 2 * x + 1];
                next[y * half + x] = (a + b + c + d) / 4.0;
            }
        }

        next
    }
}

impl FingerprintAlgorithm for WaveletHasher {
    fn compute(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let side = self.hash_size << LEVELS;
        let gray = reduce_to_gray(image, side, side)?;

        let mut band: Vec<f64> = gray.pixels().map(|p| p[0] as f64).collect();
        let mut band_side = side as usize;

        for _ in 0..LEVELS {
            band = Self::approximation(&band, band_side);
            band_side /= 2;
        }

        // Threshold against the median so the bit balance is insensitive
        // to global brightness
        let mut sorted = band.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = sorted[sorted.len() / 2];

        let bits = pack_bits(band.iter().map(|&coefficient| coefficient > median));
        Ok(Fingerprint::new(bits, FingerprintKind::Wavelet))
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Wavelet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn solid_image(value: u8) -> DynamicImage {
        let img = ImageBuffer::from_fn(128, 128, |_, _| Rgb([value, value, value]));
        DynamicImage::ImageRgb8(img)
    }

    fn half_and_half(size: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(size, size, |x, _| {
            if x < size / 2 {
                Rgb([20u8, 20, 20])
            } else {
                Rgb([220u8, 220, 220])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn identical_images_produce_identical_fingerprints() {
        let hasher = WaveletHasher::new(8);
        let image = half_and_half(128);

        let a = hasher.compute(&image).unwrap();
        let b = hasher.compute(&image).unwrap();

        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn resized_image_keeps_a_close_fingerprint() {
        let hasher = WaveletHasher::new(8);

        let large = hasher.compute(&half_and_half(256)).unwrap();
        let small = hasher.compute(&half_and_half(64)).unwrap();

        assert!(
            large.distance(&small) <= 8,
            "resize should barely move the wavelet hash, distance was {}",
            large.distance(&small)
        );
    }

    #[test]
    fn solid_image_produces_uniform_fingerprint() {
        let hasher = WaveletHasher::new(8);
        let fp = hasher.compute(&solid_image(128)).unwrap();

        // No coefficient exceeds the median of a constant band
        assert!(fp.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn fingerprint_is_64_bits_at_size_8() {
        let hasher = WaveletHasher::new(8);
        let fp = hasher.compute(&solid_image(50)).unwrap();
        assert_eq!(fp.bit_count(), 64);
    }

    #[test]
    fn approximation_halves_the_band() {
        let band: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let next = WaveletHasher::approximation(&band, 4);

        assert_eq!(next.len(), 4);
        // Top-left 2x2 block of a 4x4 row-major ramp: 0, 1, 4, 5
        assert!((next[0] - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn kind_is_wavelet() {
        assert_eq!(WaveletHasher::new(8).kind(), FingerprintKind::Wavelet);
    }
}
