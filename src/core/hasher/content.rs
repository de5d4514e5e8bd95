//! Content digests for byte-identical duplicate detection.
//!
//! BLAKE3 over the raw file bytes; large files are memory-mapped. An xxh3
//! hash of the first 4 KiB serves as a cheap "cannot be identical" filter
//! so full digests are only computed where they can matter.

use crate::error::HashError;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

/// Size of the prefix used for the cheap pre-filter (4 KiB)
const PREFIX_SIZE: usize = 4096;

/// Files at or above this size are memory-mapped instead of read whole
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// A BLAKE3 digest over a file's raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// The digest as a hexadecimal string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn digest_once(path: &Path) -> std::io::Result<ContentDigest> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();

    let hash = if len >= MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file)? };
        blake3::hash(&mmap)
    } else {
        blake3::hash(&fs::read(path)?)
    };

    Ok(ContentDigest(*hash.as_bytes()))
}

/// Digest a file's bytes, retrying once on transient I/O failure.
pub fn digest_file(path: &Path) -> Result<ContentDigest, HashError> {
    digest_once(path)
        .or_else(|_| digest_once(path))
        .map_err(|e| HashError::Compute {
            path: path.to_path_buf(),
            source: e,
        })
}

/// xxh3 of the first 4 KiB of a file.
///
/// `None` means the file could not be read; callers must keep such files
/// as candidates rather than dropping them.
pub fn prefix_hash(path: &Path) -> Option<u64> {
    let mut file = File::open(path).ok()?;
    let mut buffer = [0u8; PREFIX_SIZE];
    let bytes_read = file.read(&mut buffer).ok()?;
    Some(xxh3_64(&buffer[..bytes_read]))
}
