//! # Scanner Module
//!
//! Discovers dataset images and their caption sidecars.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - WebP (.webp)
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! A caption sidecar is a `.txt` file with the same stem as its image; it is
//! discovered here and travels with the image through every later stage.

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ImageScanner, ScanConfig, ScanOutcome, WalkDirScanner};

use crate::core::hasher::{ContentDigest, Fingerprint, FingerprintKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One scanned image file.
///
/// Created by the scanner; only the hasher attaches digests and
/// fingerprints afterwards. A record must not be reused once the relocator
/// has moved its underlying file.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    path: PathBuf,
    byte_size: u64,
    dimensions: Option<(u32, u32)>,
    sidecar: Option<PathBuf>,
    content_digest: Option<ContentDigest>,
    signatures: BTreeMap<FingerprintKind, Fingerprint>,
    decode_failed: bool,
}

impl ImageRecord {
    /// Create a record from scan-time metadata.
    pub fn new(
        path: PathBuf,
        byte_size: u64,
        dimensions: Option<(u32, u32)>,
        sidecar: Option<PathBuf>,
    ) -> Self {
        Self {
            path,
            byte_size,
            dimensions,
            sidecar,
            content_digest: None,
            signatures: BTreeMap::new(),
            decode_failed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Pixel dimensions probed from the image header at scan time;
    /// `None` when the header was unreadable.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Total pixel count, zero when the header was unreadable.
    pub fn pixel_area(&self) -> u64 {
        self.dimensions
            .map(|(w, h)| w as u64 * h as u64)
            .unwrap_or(0)
    }

    pub fn sidecar(&self) -> Option<&Path> {
        self.sidecar.as_deref()
    }

    /// The cached content digest, if one has been computed.
    pub fn content_digest(&self) -> Option<&ContentDigest> {
        self.content_digest.as_ref()
    }

    /// Cache the content digest. Computed once per record, never replaced.
    pub fn set_content_digest(&mut self, digest: ContentDigest) {
        if self.content_digest.is_none() {
            self.content_digest = Some(digest);
        }
    }

    /// The cached fingerprint for one algorithm, if present.
    pub fn fingerprint(&self, kind: FingerprintKind) -> Option<&Fingerprint> {
        self.signatures.get(&kind)
    }

    /// Attach a fingerprint. The first computation wins; fingerprints are
    /// never recomputed once present.
    pub fn attach_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.signatures
            .entry(fingerprint.kind())
            .or_insert(fingerprint);
    }

    /// Whether a previous decode attempt failed. Such records never enter
    /// perceptual layers but still participate in the exact layer.
    pub fn decode_failed(&self) -> bool {
        self.decode_failed
    }

    /// Latch the decode failure flag.
    pub fn mark_decode_failed(&mut self) {
        self.decode_failed = true;
    }
}
