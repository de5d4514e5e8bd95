//! Plan generator for duplicate group resolution.

use super::format_bytes;
use crate::core::layers::{DuplicateGroup, LayerKind};
use crate::core::quality::{ContentSignalProvider, QualityAnalyzer, RetentionScore};
use crate::core::scanner::ImageRecord;
use crate::events::{Event, EventSender, ResolveEvent};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One planned relocation: an image, its optional sidecar, and where they go
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub sidecar: Option<PathBuf>,
    /// Proposed destination; the relocator resolves collisions at apply time
    pub destination: PathBuf,
    pub byte_size: u64,
}

/// The resolution of one duplicate group: a keeper and the moves that would
/// clear out everything else. Pure data; nothing touches the filesystem
/// until the plan is applied.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    pub group_id: Uuid,
    pub layer: LayerKind,
    pub keeper: PathBuf,
    pub reason: String,
    pub moves: Vec<PlannedMove>,
}

/// Selects keepers and generates move plans
pub struct ResolutionPlanner<'a> {
    quality: &'a QualityAnalyzer,
    signals: &'a dyn ContentSignalProvider,
    quarantine: PathBuf,
}

impl<'a> ResolutionPlanner<'a> {
    pub fn new(
        quality: &'a QualityAnalyzer,
        signals: &'a dyn ContentSignalProvider,
        quarantine: PathBuf,
    ) -> Self {
        Self {
            quality,
            signals,
            quarantine,
        }
    }

    /// Resolve a group: the member with the highest retention score is the
    /// keeper (path ascending breaks full ties), every other member gets a
    /// move into quarantine preserving its filename.
    pub fn plan(&self, group: &DuplicateGroup, events: &EventSender) -> ResolutionPlan {
        let mut scored: Vec<(&ImageRecord, RetentionScore)> = group
            .members
            .iter()
            .map(|record| {
                let signal = self.signals.signal_for(record.path());
                let (score, error) = self.quality.score_record(record, signal);
                if let Some(error) = error {
                    events.send(Event::Resolve(ResolveEvent::ScoringFallback {
                        path: record.path().to_path_buf(),
                        message: error.to_string(),
                    }));
                }
                (record, score)
            })
            .collect();

        // Best first; lexicographically smaller path wins full ties
        scored.sort_by(|a, b| {
            b.1.cmp_quality(&a.1)
                .then_with(|| a.0.path().cmp(b.0.path()))
        });

        let (keeper, keeper_score) = &scored[0];
        let reason = build_reason(keeper, keeper_score, &scored[1..]);

        let moves: Vec<PlannedMove> = group
            .members
            .iter()
            .filter(|record| record.path() != keeper.path())
            .map(|record| PlannedMove {
                source: record.path().to_path_buf(),
                sidecar: record.sidecar().map(Path::to_path_buf),
                destination: self.quarantine.join(
                    record
                        .path()
                        .file_name()
                        .expect("scanned files have names"),
                ),
                byte_size: record.byte_size(),
            })
            .collect();

        events.send(Event::Resolve(ResolveEvent::GroupResolved {
            group_id: group.id,
            keeper: keeper.path().to_path_buf(),
            reason: reason.clone(),
            relocations: moves.len(),
        }));

        ResolutionPlan {
            group_id: group.id,
            layer: group.layer,
            keeper: keeper.path().to_path_buf(),
            reason,
            moves,
        }
    }
}

fn fmt_dimensions(record: &ImageRecord) -> String {
    match record.dimensions() {
        Some((w, h)) => format!("{}x{}", w, h),
        None => "unknown".to_string(),
    }
}

/// Name the criterion that decided the keeper, comparing against the
/// runner-up.
fn build_reason(
    keeper: &ImageRecord,
    keeper_score: &RetentionScore,
    losers: &[(&ImageRecord, RetentionScore)],
) -> String {
    let Some((runner_up, runner_score)) = losers.first() else {
        return "only member".to_string();
    };

    if keeper_score.degraded {
        return "kept first path: no member could be scored".to_string();
    }
    if runner_score.degraded {
        return "kept only readable copy".to_string();
    }

    if keeper_score.pixel_area > runner_score.pixel_area {
        return format!(
            "kept larger resolution: {} vs {}",
            fmt_dimensions(keeper),
            fmt_dimensions(runner_up)
        );
    }
    if keeper_score.sharpness > runner_score.sharpness {
        return format!(
            "kept sharper copy (edge energy {:.0} vs {:.0})",
            keeper_score.sharpness, runner_score.sharpness
        );
    }
    if let (Some(a), Some(b)) = (keeper_score.signal, runner_score.signal) {
        if a > b {
            return format!("kept higher content signal ({:.2} vs {:.2})", a, b);
        }
    }
    if keeper_score.byte_size > runner_score.byte_size {
        return format!(
            "kept larger file: {} vs {}",
            format_bytes(keeper_score.byte_size),
            format_bytes(runner_score.byte_size)
        );
    }

    "kept first path: members are equivalent".to_string()
}
