//! Executes move plans: image and sidecar relocate as one logical operation.

use super::planner::PlannedMove;
use crate::error::RelocateError;
use crate::events::{ApplyEvent, Event, EventSender};
use std::fs;
use std::path::{Path, PathBuf};

/// Where an applied move actually landed
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub destination: PathBuf,
    pub sidecar_destination: Option<PathBuf>,
}

/// Moves duplicates into the quarantine directory.
///
/// Single-threaded by design: the quarantine directory is the one shared
/// mutable resource, and serializing moves through here keeps collision
/// suffixes deterministic.
pub struct FileRelocator {
    quarantine: PathBuf,
    bytes_reclaimed: u64,
    files_moved: usize,
}

impl FileRelocator {
    pub fn new(quarantine: PathBuf) -> Self {
        Self {
            quarantine,
            bytes_reclaimed: 0,
            files_moved: 0,
        }
    }

    /// Total bytes of relocated images (sidecars excluded)
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_reclaimed
    }

    /// Number of images relocated
    pub fn files_moved(&self) -> usize {
        self.files_moved
    }

    /// Apply one planned move.
    ///
    /// The image moves first, then its sidecar to the same directory with a
    /// matching stem. A sidecar failure after the image moved is returned as
    /// `RelocateError::Partial`; the caller reports it and continues.
    pub fn apply(
        &mut self,
        planned: &PlannedMove,
        events: &EventSender,
    ) -> Result<MoveOutcome, RelocateError> {
        fs::create_dir_all(&self.quarantine).map_err(|e| RelocateError::QuarantineCreate {
            path: self.quarantine.clone(),
            source: e,
        })?;

        let (destination, sidecar_destination) =
            resolve_destination(&planned.destination, planned.sidecar.as_deref());

        move_file(&planned.source, &destination).map_err(|e| RelocateError::Move {
            path: planned.source.clone(),
            source: e,
        })?;

        self.files_moved += 1;
        self.bytes_reclaimed += planned.byte_size;
        events.send(Event::Apply(ApplyEvent::FileMoved {
            from: planned.source.clone(),
            to: destination.clone(),
            bytes: planned.byte_size,
        }));

        if let (Some(sidecar), Some(sidecar_dest)) =
            (planned.sidecar.as_ref(), sidecar_destination.as_ref())
        {
            if let Err(e) = move_file(sidecar, sidecar_dest) {
                events.send(Event::Apply(ApplyEvent::PartialFailure {
                    moved: planned.source.clone(),
                    stranded: sidecar.clone(),
                    message: e.to_string(),
                }));
                return Err(RelocateError::Partial {
                    moved: planned.source.clone(),
                    stranded: sidecar.clone(),
                    source: e,
                });
            }

            events.send(Event::Apply(ApplyEvent::SidecarMoved {
                from: sidecar.clone(),
                to: sidecar_dest.clone(),
            }));
        }

        Ok(MoveOutcome {
            destination,
            sidecar_destination,
        })
    }
}

/// Find a free destination, counting up a numeric suffix on collision.
///
/// Both the image destination and the derived sidecar destination must be
/// free before either move starts, so a suffixed pair keeps matching stems.
fn resolve_destination(proposed: &Path, sidecar: Option<&Path>) -> (PathBuf, Option<PathBuf>) {
    let sidecar_ext = sidecar
        .and_then(|s| s.extension())
        .map(|e| e.to_os_string());

    let sidecar_for = |image_dest: &Path| {
        sidecar_ext
            .as_ref()
            .map(|ext| image_dest.with_extension(ext))
    };

    let mut candidate = proposed.to_path_buf();
    let mut counter = 1;

    loop {
        let sidecar_candidate = sidecar_for(&candidate);
        let sidecar_taken = sidecar_candidate
            .as_ref()
            .map(|p| p.exists())
            .unwrap_or(false);

        if !candidate.exists() && !sidecar_taken {
            return (candidate, sidecar_candidate);
        }

        let stem = proposed
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let name = match proposed.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        candidate = proposed.with_file_name(name);
        counter += 1;
    }
}

/// Rename, falling back to copy-verify-delete for cross-filesystem moves.
fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::rename(source, destination).or_else(|_| {
        let source_size = fs::metadata(source)?.len();
        fs::copy(source, destination)?;

        let dest_size = fs::metadata(destination)?.len();
        if dest_size != source_size {
            // Incomplete copy; keep the source
            let _ = fs::remove_file(destination);
            return Err(std::io::Error::other(format!(
                "copy verification failed: source {} bytes, destination {} bytes",
                source_size, dest_size
            )));
        }

        fs::remove_file(source)
    })
}
