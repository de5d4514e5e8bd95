//! Fingerprint value type and the algorithm dispatch enumeration.

use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// The supported perceptual fingerprint algorithms.
///
/// A tagged enumeration rather than open-ended dispatch: every layer names
/// its algorithm here, and fingerprints are only comparable within a single
/// variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FingerprintKind {
    /// Average hash (aHash) - broad visual similarity, least discriminating
    Average,
    /// Difference hash (dHash) - brightness gradients, catches crops and minor edits
    Difference,
    /// Haar wavelet hash (wHash) - robust to compression artifacts and resizing
    Wavelet,
    /// DCT-style hash (pHash) at 16x16 - high-resolution, near-exact matching
    Perceptual,
}

impl FingerprintKind {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            FingerprintKind::Average => {
                "Average hash - compares each pixel to the mean brightness"
            }
            FingerprintKind::Difference => {
                "Difference hash - compares brightness gradients between pixels"
            }
            FingerprintKind::Wavelet => {
                "Wavelet hash - thresholds the low-frequency Haar band"
            }
            FingerprintKind::Perceptual => {
                "Perceptual hash - DCT-based, robust to edits and re-encodes"
            }
        }
    }
}

impl std::fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintKind::Average => write!(f, "average"),
            FingerprintKind::Difference => write!(f, "difference"),
            FingerprintKind::Wavelet => write!(f, "wavelet"),
            FingerprintKind::Perceptual => write!(f, "perceptual"),
        }
    }
}

/// Trait for fingerprint algorithm implementations
pub trait FingerprintAlgorithm: Send + Sync {
    /// Compute a fingerprint from an already-decoded image
    fn compute(&self, image: &DynamicImage) -> Result<Fingerprint, HashError>;

    /// Get the algorithm variant
    fn kind(&self) -> FingerprintKind;
}

/// A fixed-width perceptual fingerprint, compared by Hamming distance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    bits: Vec<u8>,
    kind: FingerprintKind,
}

impl Fingerprint {
    /// Create a new fingerprint value
    pub fn new(bits: Vec<u8>, kind: FingerprintKind) -> Self {
        Self { bits, kind }
    }

    /// The algorithm that produced this fingerprint
    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    /// The raw fingerprint bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Total number of bits in this fingerprint
    pub fn bit_count(&self) -> u32 {
        (self.bits.len() * 8) as u32
    }

    /// Hamming distance: the number of bits that differ.
    ///
    /// Only meaningful between fingerprints of the same kind; the grouping
    /// engine never mixes kinds.
    pub fn distance(&self, other: &Self) -> u32 {
        debug_assert_eq!(self.kind, other.kind);
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// The fingerprint as a hexadecimal string
    pub fn to_hex(&self) -> String {
        self.bits.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Pack a row-major sequence of bits (true = 1) into bytes, MSB first.
///
/// Shared by the hand-rolled hashers; each produces hash_size * hash_size
/// bits from its own pixel predicate.
pub(crate) fn pack_bits(bits: impl Iterator<Item = bool>) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut current: u8 = 0;
    let mut position = 0;

    for bit in bits {
        if bit {
            current |= 1 << (7 - position);
        }
        position += 1;
        if position == 8 {
            bytes.push(current);
            current = 0;
            position = 0;
        }
    }

    if position > 0 {
        bytes.push(current);
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(bits: &[u8]) -> Fingerprint {
        Fingerprint::new(bits.to_vec(), FingerprintKind::Difference)
    }

    #[test]
    fn distance_to_self_is_zero() {
        let fp = fingerprint(&[0xFF, 0x00, 0xAA, 0x55]);
        assert_eq!(fp.distance(&fp), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = fingerprint(&[0xFF, 0x00]);
        let b = fingerprint(&[0x00, 0xFF]);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn distance_counts_differing_bits() {
        let a = fingerprint(&[0b1111_1111]);
        let b = fingerprint(&[0b0000_0000]);
        assert_eq!(a.distance(&b), 8);
    }

    #[test]
    fn to_hex_produces_expected_string() {
        let fp = fingerprint(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(fp.to_hex(), "deadbeef");
    }

    #[test]
    fn pack_bits_msb_first() {
        let bytes = pack_bits([true, false, false, false, false, false, false, true].into_iter());
        assert_eq!(bytes, vec![0b1000_0001]);
    }

    #[test]
    fn pack_bits_pads_partial_byte() {
        let bytes = pack_bits([true, true, true].into_iter());
        assert_eq!(bytes, vec![0b1110_0000]);
    }

    #[test]
    fn kind_display_matches_signature_names() {
        assert_eq!(FingerprintKind::Average.to_string(), "average");
        assert_eq!(FingerprintKind::Difference.to_string(), "difference");
        assert_eq!(FingerprintKind::Wavelet.to_string(), "wavelet");
        assert_eq!(FingerprintKind::Perceptual.to_string(), "perceptual");
    }
}
