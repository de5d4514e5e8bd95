//! # Dataset Dedupe
//!
//! Layered duplicate detection and cleanup for image datasets.
//!
//! ## Core Philosophy
//! - **Reversible** - duplicates are moved to a quarantine directory, never
//!   deleted
//! - **Show WHY** - every keeper decision carries a human-readable reason
//! - **Captions travel** - a caption sidecar always follows its image
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation
//! layers:
//! - `core` - scanning, hashing, the detection-layer cascade, resolution
//! - `events` - event-driven progress reporting
//! - `error` - error types
//! - `cli` - command-line interface

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DedupeError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
