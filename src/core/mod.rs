//! # Core Module
//!
//! The UI-agnostic deduplication engine.
//!
//! ## Modules
//! - `scanner` - discovers images and caption sidecars
//! - `hasher` - content digests and perceptual fingerprints
//! - `quality` - retention scoring for keeper selection
//! - `layers` - the detection-layer cascade and grouping
//! - `resolver` - resolution planning and file relocation
//! - `session` - the session state machine and `run` entry point

pub mod hasher;
pub mod layers;
pub mod quality;
pub mod resolver;
pub mod scanner;
pub mod session;

// Re-export commonly used types
pub use hasher::{ContentDigest, Fingerprint, FingerprintKind};
pub use layers::{DuplicateGroup, LayerKind, LayerThresholds};
pub use quality::{ContentSignalProvider, RetentionScore};
pub use resolver::{PlannedMove, ResolutionPlan};
pub use scanner::ImageRecord;
pub use session::{DedupeEngine, Decision, DecisionPrompt, Mode, SessionSummary};
