//! Event type definitions for progress reporting.

use crate::core::hasher::FingerprintKind;
use crate::core::layers::LayerKind;
use crate::core::session::{Mode, SessionSummary};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// All events emitted by the deduplication engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory scanning events
    Scan(ScanEvent),
    /// Digest and fingerprint computation events
    Hash(HashEvent),
    /// Detection layer events
    Layer(LayerEvent),
    /// Resolution planning events
    Resolve(ResolveEvent),
    /// File relocation events
    Apply(ApplyEvent),
    /// Session-level events
    Session(SessionEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// An image was found (with or without a caption sidecar)
    ImageFound { path: PathBuf, has_sidecar: bool },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed {
        total_images: usize,
        with_sidecars: usize,
    },
}

/// Which hashing stage is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashStage {
    /// Content digests for the exact layer
    Content,
    /// Perceptual fingerprints for one algorithm
    Fingerprint(FingerprintKind),
}

impl std::fmt::Display for HashStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashStage::Content => write!(f, "content digests"),
            HashStage::Fingerprint(kind) => write!(f, "{} fingerprints", kind),
        }
    }
}

/// Events during digest/fingerprint computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// A hashing stage has started
    Started { stage: HashStage, total: usize },
    /// Progress update
    Progress(HashProgress),
    /// A file failed to hash; it is excluded from the affected layer
    Error { path: PathBuf, message: String },
    /// A hashing stage completed
    Completed {
        stage: HashStage,
        computed: usize,
        failed: usize,
    },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of records hashed so far in this stage
    pub completed: usize,
    /// Total records in this stage
    pub total: usize,
    /// Current file being hashed
    pub current_path: PathBuf,
}

/// Events during the detection layer cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LayerEvent {
    /// A layer started over the current ungrouped pool
    Started { layer: LayerKind, pool: usize },
    /// A duplicate group was formed
    GroupFormed {
        group_id: Uuid,
        layer: LayerKind,
        members: Vec<PathBuf>,
    },
    /// A layer finished
    Completed {
        layer: LayerKind,
        groups_formed: usize,
    },
}

/// Events during resolution planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResolveEvent {
    /// A keeper was chosen for a group
    GroupResolved {
        group_id: Uuid,
        keeper: PathBuf,
        reason: String,
        relocations: usize,
    },
    /// Quality metrics could not be computed; the record scores lowest
    ScoringFallback { path: PathBuf, message: String },
}

/// Events during plan application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApplyEvent {
    /// An image was moved into quarantine
    FileMoved {
        from: PathBuf,
        to: PathBuf,
        bytes: u64,
    },
    /// A caption sidecar followed its image
    SidecarMoved { from: PathBuf, to: PathBuf },
    /// One half of an image/sidecar pair moved, the other did not
    PartialFailure {
        moved: PathBuf,
        stranded: PathBuf,
        message: String,
    },
    /// A move failed entirely; both files remain in place
    Error { path: PathBuf, message: String },
}

/// Session-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The session started
    Started { directory: PathBuf, mode: Mode },
    /// The user skipped a group; its members stay in place
    GroupSkipped { group_id: Uuid },
    /// Every remaining group in a layer was skipped
    LayerSkipped { layer: LayerKind },
    /// The user aborted; applied groups stay applied
    Aborted,
    /// The session completed
    Completed { summary: SessionSummary },
}
