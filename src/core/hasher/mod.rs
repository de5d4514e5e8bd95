//! # Hasher Module
//!
//! Content digests and perceptual fingerprints.
//!
//! ## Fingerprint Algorithms
//! - **average** - mean-brightness bits, broad similarity
//! - **difference** - horizontal gradient bits, structural similarity
//! - **wavelet** - Haar low-frequency band, survives compression/resizing
//! - **perceptual** - DCT-style 256-bit, near-exact matching
//!
//! ## How It Works
//! 1. Decode (zune-jpeg fast path) and shrink to a small grayscale grid
//! 2. Compute bits from pixel relationships
//! 3. Compare fingerprints of the same kind by Hamming distance
//!
//! Digest and fingerprint computation run on the rayon pool; each record is
//! written by exactly one task, so no locking is needed. Everything is
//! cached on the record and never recomputed once present.

mod algorithms;
mod content;
mod decode;
mod resize;
mod traits;

pub use algorithms::{AverageHasher, DifferenceHasher, PerceptualHasher, WaveletHasher};
pub use content::{digest_file, prefix_hash, ContentDigest};
pub use decode::decode;
pub use resize::reduce_to_gray;
pub use traits::{Fingerprint, FingerprintAlgorithm, FingerprintKind};

use crate::core::scanner::ImageRecord;
use crate::error::HashError;
use crate::events::{Event, EventSender, HashEvent, HashProgress, HashStage};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Grid for the hand-rolled hashers (64 bits)
const GRID_SIZE: u32 = 8;

/// Grid for the high-resolution near-exact fingerprint (256 bits)
const PERCEPTUAL_GRID_SIZE: u32 = 16;

/// Construct the algorithm for a fingerprint kind at its fixed size.
pub fn algorithm_for(kind: FingerprintKind) -> Box<dyn FingerprintAlgorithm> {
    match kind {
        FingerprintKind::Average => Box::new(AverageHasher::new(GRID_SIZE)),
        FingerprintKind::Difference => Box::new(DifferenceHasher::new(GRID_SIZE)),
        FingerprintKind::Wavelet => Box::new(WaveletHasher::new(GRID_SIZE)),
        FingerprintKind::Perceptual => Box::new(PerceptualHasher::new(PERCEPTUAL_GRID_SIZE)),
    }
}

/// Decode a file and compute one fingerprint.
pub fn fingerprint_file(kind: FingerprintKind, path: &Path) -> Result<Fingerprint, HashError> {
    let image = decode::decode(path)?;
    algorithm_for(kind).compute(&image)
}

/// Attaches digests and fingerprints to records, in parallel.
pub struct FingerprintEngine;

impl FingerprintEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute and cache content digests for the candidate records
    /// (addressed by index into `records`).
    ///
    /// Failures are retried once inside `digest_file`; a record that still
    /// fails is reported through the event channel and left without a
    /// digest, which excludes it from the exact layer.
    pub fn content_digests(
        &self,
        records: &mut [ImageRecord],
        candidates: &HashSet<usize>,
        events: &EventSender,
    ) {
        let total = candidates.len();
        events.send(Event::Hash(HashEvent::Started {
            stage: HashStage::Content,
            total,
        }));

        let computed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);

        records
            .par_iter_mut()
            .enumerate()
            .filter(|(i, record)| candidates.contains(i) && record.content_digest().is_none())
            .for_each(|(_, record)| {
                let current = done.fetch_add(1, Ordering::SeqCst) + 1;

                match content::digest_file(record.path()) {
                    Ok(digest) => {
                        record.set_content_digest(digest);
                        computed.fetch_add(1, Ordering::SeqCst);
                        events.send(Event::Hash(HashEvent::Progress(HashProgress {
                            completed: current,
                            total,
                            current_path: record.path().to_path_buf(),
                        })));
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                        events.send(Event::Hash(HashEvent::Error {
                            path: record.path().to_path_buf(),
                            message: e.to_string(),
                        }));
                    }
                }
            });

        events.send(Event::Hash(HashEvent::Completed {
            stage: HashStage::Content,
            computed: computed.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
        }));
    }

    /// Compute missing fingerprints of one kind for every record that can
    /// still be decoded.
    ///
    /// A record whose decode fails is latched as decode-failed and reported;
    /// later perceptual layers will not attempt it again.
    pub fn fingerprints(
        &self,
        kind: FingerprintKind,
        records: &mut [ImageRecord],
        events: &EventSender,
    ) {
        let algorithm = algorithm_for(kind);

        let total = records
            .iter()
            .filter(|r| !r.decode_failed() && r.fingerprint(kind).is_none())
            .count();

        events.send(Event::Hash(HashEvent::Started {
            stage: HashStage::Fingerprint(kind),
            total,
        }));

        let computed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);

        records
            .par_iter_mut()
            .filter(|record| !record.decode_failed() && record.fingerprint(kind).is_none())
            .for_each(|record| {
                let current = done.fetch_add(1, Ordering::SeqCst) + 1;

                let result =
                    decode::decode(record.path()).and_then(|image| algorithm.compute(&image));

                match result {
                    Ok(fingerprint) => {
                        record.attach_fingerprint(fingerprint);
                        computed.fetch_add(1, Ordering::SeqCst);
                        events.send(Event::Hash(HashEvent::Progress(HashProgress {
                            completed: current,
                            total,
                            current_path: record.path().to_path_buf(),
                        })));
                    }
                    Err(e) => {
                        record.mark_decode_failed();
                        failed.fetch_add(1, Ordering::SeqCst);
                        events.send(Event::Hash(HashEvent::Error {
                            path: record.path().to_path_buf(),
                            message: e.to_string(),
                        }));
                    }
                }
            });

        events.send(Event::Hash(HashEvent::Completed {
            stage: HashStage::Fingerprint(kind),
            computed: computed.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
        }));
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use image::{ImageBuffer, Rgb};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn save_png(dir: &TempDir, name: &str, seed: u8) -> PathBuf {
        let path = dir.path().join(name);
        let img = ImageBuffer::from_fn(32, 32, |x, y| {
            Rgb([
                seed.wrapping_add((x * 3) as u8),
                seed.wrapping_add((y * 5) as u8),
                seed,
            ])
        });
        img.save(&path).unwrap();
        path
    }

    fn record_for(path: PathBuf) -> ImageRecord {
        let size = fs::metadata(&path).unwrap().len();
        let dimensions = image::image_dimensions(&path).ok();
        ImageRecord::new(path, size, dimensions, None)
    }

    #[test]
    fn content_digests_only_touch_candidates() {
        let dir = TempDir::new().unwrap();
        let mut records = vec![
            record_for(save_png(&dir, "a.png", 0)),
            record_for(save_png(&dir, "b.png", 64)),
        ];

        let engine = FingerprintEngine::new();
        let candidates: HashSet<usize> = [0].into_iter().collect();
        engine.content_digests(&mut records, &candidates, &null_sender());

        assert!(records[0].content_digest().is_some());
        assert!(records[1].content_digest().is_none());
    }

    #[test]
    fn fingerprints_attach_to_decodable_records() {
        let dir = TempDir::new().unwrap();
        let mut records = vec![record_for(save_png(&dir, "a.png", 0))];

        let engine = FingerprintEngine::new();
        engine.fingerprints(FingerprintKind::Average, &mut records, &null_sender());

        assert!(records[0].fingerprint(FingerprintKind::Average).is_some());
        assert!(!records[0].decode_failed());
    }

    #[test]
    fn undecodable_record_is_latched_and_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not an image").unwrap();
        let mut records = vec![record_for(path)];

        let engine = FingerprintEngine::new();
        engine.fingerprints(FingerprintKind::Average, &mut records, &null_sender());

        assert!(records[0].decode_failed());
        assert!(records[0].fingerprint(FingerprintKind::Average).is_none());

        // Second stage must not clear the latch or attach anything
        engine.fingerprints(FingerprintKind::Wavelet, &mut records, &null_sender());
        assert!(records[0].fingerprint(FingerprintKind::Wavelet).is_none());
    }

    #[test]
    fn identical_files_share_a_digest() {
        let dir = TempDir::new().unwrap();
        let a = save_png(&dir, "a.png", 7);
        let b = dir.path().join("b.png");
        fs::copy(&a, &b).unwrap();

        let mut records = vec![record_for(a), record_for(b)];
        let engine = FingerprintEngine::new();
        let candidates: HashSet<usize> = [0, 1].into_iter().collect();
        engine.content_digests(&mut records, &candidates, &null_sender());

        assert_eq!(records[0].content_digest(), records[1].content_digest());
    }
}
