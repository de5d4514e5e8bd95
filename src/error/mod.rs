//! # Error Module
//!
//! Error types for the deduplication engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors never abort a session** - they are reported through
//!   the event channel and the file is excluded from the affected layer
//!
//! Destination collisions are deliberately absent from this taxonomy: the
//! relocator resolves them with a numeric suffix, so they are never errors.
//! A user abort is also not an error; the session returns a summary of the
//! partial work instead.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Scoring error: {0}")]
    Score(#[from] ScoreError),

    #[error("Relocation error: {0}")]
    Relocate(#[from] RelocateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering images
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while computing digests or fingerprints
#[derive(Error, Debug)]
pub enum HashError {
    /// The file could not be decoded as an image. The record is excluded
    /// from perceptual layers but still participates in the exact layer.
    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// I/O failure while reading bytes for the content digest. Retried
    /// once by the hasher; surfacing this error means the retry also
    /// failed and the record is excluded from the exact layer.
    #[error("Failed to read {path} for hashing: {source}")]
    Compute {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resize failed: {reason}")]
    Resize { reason: String },
}

/// Errors that occur while scoring retention quality
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Pixel data could not be reloaded for scoring. The record is scored
    /// as lowest priority; the session continues.
    #[error("Quality metrics unavailable for {path}: {reason}")]
    Fallback { path: PathBuf, reason: String },
}

/// Errors that occur while relocating files into quarantine
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Failed to create quarantine directory {path}: {source}")]
    QuarantineCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {path}: {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image and its sidecar did not both move. Names which half
    /// completed so the presentation layer can surface exactly what is
    /// where; the session continues.
    #[error("{moved} moved to quarantine but {stranded} did not: {source}")]
    Partial {
        /// The file that reached the quarantine directory
        moved: PathBuf,
        /// The file left behind at its original location
        stranded: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DedupeError>;
