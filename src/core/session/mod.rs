//! # Session Module
//!
//! Drives the per-layer workflow: scan, cascade, review, apply, summarize.
//!
//! ## State machine
//! `Idle -> LayerPending -> AwaitingDecision -> Applying -> LayerPending ->
//! ... -> Completed`, with `Aborted` reachable from `AwaitingDecision` and
//! `Applying`. Unattended mode never enters `AwaitingDecision`.
//!
//! Everything from grouping onward is single-threaded: decisions and file
//! moves stay deterministic, and an abort is honored between group
//! applications, never mid image/sidecar pair.

use crate::core::hasher::FingerprintEngine;
use crate::core::layers::{DetectionLayer, LayerThresholds};
use crate::core::quality::{ContentSignalProvider, NoSignal, QualityAnalyzer};
use crate::core::resolver::{FileRelocator, ResolutionPlan, ResolutionPlanner};
use crate::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
use crate::error::{RelocateError, Result};
use crate::events::{null_sender, ApplyEvent, Event, EventSender, SessionEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How decisions are made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Present each group's plan for review
    Interactive,
    /// Apply every plan without prompting
    Unattended,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Interactive => write!(f, "interactive"),
            Mode::Unattended => write!(f, "unattended"),
        }
    }
}

/// The three possible answers to a group review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Commit every remaining plan in the current layer without prompting
    ApplyLayer,
    /// Leave this group's members untouched and move on
    SkipGroup,
    /// Stop processing; applied groups stay applied, the rest stays as found
    Abort,
}

/// Presentation-layer hook for interactive review.
///
/// Called once per group until a decision of `ApplyLayer` covers the rest
/// of the layer. Never called in unattended mode.
pub trait DecisionPrompt {
    fn review(&mut self, plan: &ResolutionPlan, group_index: usize, total_groups: usize)
        -> Decision;
}

/// A prompt that applies everything; what unattended mode amounts to.
pub struct ApplyAll;

impl DecisionPrompt for ApplyAll {
    fn review(&mut self, _plan: &ResolutionPlan, _index: usize, _total: usize) -> Decision {
        Decision::ApplyLayer
    }
}

/// Session controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    LayerPending,
    AwaitingDecision,
    Applying,
    Completed,
    Aborted,
}

/// Counts describing what a session did. Purely informational.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Images discovered by the scan
    pub scanned: usize,
    /// Duplicate groups formed across all layers
    pub groups_formed: usize,
    /// Groups resolved (one keeper retained each)
    pub kept: usize,
    /// Images relocated to quarantine
    pub moved: usize,
    /// Total bytes of relocated images
    pub bytes_reclaimed: u64,
    /// Relocations per layer name
    pub moved_by_layer: BTreeMap<String, usize>,
    /// Groups the reviewer skipped
    pub skipped_groups: usize,
    /// Image/sidecar pairs that only half-moved
    pub partial_failures: usize,
    /// Scan and relocation errors observed by the controller
    pub errors: usize,
    /// Whether the session ended by user abort
    pub aborted: bool,
}

/// The deduplication engine: configuration plus the `run` entry point.
///
/// All configuration is passed in explicitly - no ambient state - so
/// parallel test runs stay deterministic.
pub struct DedupeEngine {
    directory: PathBuf,
    quarantine: PathBuf,
    mode: Mode,
    thresholds: LayerThresholds,
    scan_config: ScanConfig,
    signals: Box<dyn ContentSignalProvider>,
}

/// Builder for [`DedupeEngine`]
pub struct DedupeEngineBuilder {
    directory: PathBuf,
    quarantine: Option<PathBuf>,
    mode: Mode,
    thresholds: LayerThresholds,
    scan_config: ScanConfig,
    signals: Box<dyn ContentSignalProvider>,
}

impl DedupeEngineBuilder {
    /// Deduplication mode (default: interactive)
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Per-layer Hamming thresholds
    pub fn thresholds(mut self, thresholds: LayerThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Quarantine directory (default: `<directory>/duplicates`)
    pub fn quarantine(mut self, quarantine: PathBuf) -> Self {
        self.quarantine = Some(quarantine);
        self
    }

    /// Scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// External content signal provider for quality scoring
    pub fn signals(mut self, signals: Box<dyn ContentSignalProvider>) -> Self {
        self.signals = signals;
        self
    }

    pub fn build(self) -> DedupeEngine {
        let quarantine = self
            .quarantine
            .unwrap_or_else(|| self.directory.join("duplicates"));

        // The quarantine subtree is never scanned; rescanning already-moved
        // duplicates would undo the idempotence of a second run
        let mut scan_config = self.scan_config;
        scan_config.exclude = Some(quarantine.clone());

        DedupeEngine {
            directory: self.directory,
            quarantine,
            mode: self.mode,
            thresholds: self.thresholds,
            scan_config,
            signals: self.signals,
        }
    }
}

impl DedupeEngine {
    pub fn builder(directory: impl Into<PathBuf>) -> DedupeEngineBuilder {
        DedupeEngineBuilder {
            directory: directory.into(),
            quarantine: None,
            mode: Mode::Interactive,
            thresholds: LayerThresholds::default(),
            scan_config: ScanConfig::default(),
            signals: Box::new(NoSignal),
        }
    }

    pub fn quarantine(&self) -> &Path {
        &self.quarantine
    }

    /// Run without event reporting.
    pub fn run(&self, prompt: &mut dyn DecisionPrompt) -> Result<SessionSummary> {
        self.run_with_events(&null_sender(), prompt)
    }

    /// Run the full session: scan, cascade the detection layers, review and
    /// apply group by group, and return the summary.
    ///
    /// An abort is not an error: the summary comes back with `aborted` set
    /// and reflects the partial work.
    pub fn run_with_events(
        &self,
        events: &EventSender,
        prompt: &mut dyn DecisionPrompt,
    ) -> Result<SessionSummary> {
        let mut state = SessionState::Idle;
        let mut summary = SessionSummary::default();

        events.send(Event::Session(SessionEvent::Started {
            directory: self.directory.clone(),
            mode: self.mode,
        }));

        let scanner = WalkDirScanner::new(self.scan_config.clone());
        let outcome = scanner.scan(&self.directory, events)?;
        summary.scanned = outcome.records.len();
        summary.errors += outcome.errors.len();

        let mut pool = outcome.records;

        let engine = FingerprintEngine::new();
        let quality = QualityAnalyzer::default();
        let planner =
            ResolutionPlanner::new(&quality, self.signals.as_ref(), self.quarantine.clone());
        let mut relocator = FileRelocator::new(self.quarantine.clone());

        'layers: for layer in DetectionLayer::catalogue(&self.thresholds) {
            transition(&mut state, SessionState::LayerPending);

            let (groups, remaining) = layer.partition(pool, &engine, events);
            pool = remaining;
            summary.groups_formed += groups.len();

            let mut plans: Vec<ResolutionPlan> =
                groups.iter().map(|g| planner.plan(g, events)).collect();
            // Keeper-path order makes repeated runs present groups
            // identically
            plans.sort_by(|a, b| a.keeper.cmp(&b.keeper));

            let total = plans.len();
            let mut layer_skipped = 0;
            let mut auto_apply = self.mode == Mode::Unattended;

            for (index, plan) in plans.iter().enumerate() {
                if !auto_apply {
                    transition(&mut state, SessionState::AwaitingDecision);
                    match prompt.review(plan, index + 1, total) {
                        Decision::ApplyLayer => auto_apply = true,
                        Decision::SkipGroup => {
                            summary.skipped_groups += 1;
                            layer_skipped += 1;
                            events.send(Event::Session(SessionEvent::GroupSkipped {
                                group_id: plan.group_id,
                            }));
                            continue;
                        }
                        Decision::Abort => {
                            transition(&mut state, SessionState::Aborted);
                            summary.aborted = true;
                            events.send(Event::Session(SessionEvent::Aborted));
                            break 'layers;
                        }
                    }
                }

                transition(&mut state, SessionState::Applying);
                self.apply_plan(plan, &mut relocator, events, &mut summary);
                summary.kept += 1;
            }

            if total > 0 && layer_skipped == total {
                events.send(Event::Session(SessionEvent::LayerSkipped {
                    layer: layer.kind(),
                }));
            }
        }

        if !summary.aborted {
            transition(&mut state, SessionState::Completed);
        }
        let _ = state;

        summary.moved = relocator.files_moved();
        summary.bytes_reclaimed = relocator.bytes_reclaimed();

        events.send(Event::Session(SessionEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(summary)
    }

    fn apply_plan(
        &self,
        plan: &ResolutionPlan,
        relocator: &mut FileRelocator,
        events: &EventSender,
        summary: &mut SessionSummary,
    ) {
        for planned in &plan.moves {
            match relocator.apply(planned, events) {
                Ok(_) => {
                    *summary
                        .moved_by_layer
                        .entry(plan.layer.to_string())
                        .or_insert(0) += 1;
                }
                Err(RelocateError::Partial { .. }) => {
                    // The image half completed; the relocator already
                    // reported the stranded sidecar
                    summary.partial_failures += 1;
                    *summary
                        .moved_by_layer
                        .entry(plan.layer.to_string())
                        .or_insert(0) += 1;
                }
                Err(e) => {
                    summary.errors += 1;
                    events.send(Event::Apply(ApplyEvent::Error {
                        path: planned.source.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    if *state != next {
        tracing::debug!(from = ?state, to = ?next, "session state");
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::TempDir;

    /// A prompt driven by a fixed script of decisions
    struct Scripted {
        decisions: VecDeque<Decision>,
        reviews: usize,
    }

    impl Scripted {
        fn new(decisions: &[Decision]) -> Self {
            Self {
                decisions: decisions.iter().copied().collect(),
                reviews: 0,
            }
        }
    }

    impl DecisionPrompt for Scripted {
        fn review(&mut self, _plan: &ResolutionPlan, _index: usize, _total: usize) -> Decision {
            self.reviews += 1;
            self.decisions.pop_front().unwrap_or(Decision::SkipGroup)
        }
    }

    fn save_png(dir: &Path, name: &str, seed: u8) -> PathBuf {
        let path = dir.join(name);
        let img = ImageBuffer::from_fn(32, 32, |x, y| {
            Rgb([
                seed.wrapping_add((x * 7) as u8),
                seed.wrapping_add((y * 13) as u8),
                seed,
            ])
        });
        img.save(&path).unwrap();
        path
    }

    fn engine(dir: &Path, mode: Mode) -> DedupeEngine {
        DedupeEngine::builder(dir).mode(mode).build()
    }

    #[test]
    fn unattended_run_resolves_exact_duplicates() {
        let temp = TempDir::new().unwrap();
        let a = save_png(temp.path(), "a.png", 1);
        let b = temp.path().join("b.png");
        fs::copy(&a, &b).unwrap();
        fs::write(temp.path().join("b.txt"), b"caption for b").unwrap();

        let summary = engine(temp.path(), Mode::Unattended)
            .run(&mut ApplyAll)
            .unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.moved, 1);
        assert!(summary.bytes_reclaimed > 0);
        assert!(!summary.aborted);

        // Identical copies tie all the way down; a.png wins on path
        assert!(a.exists());
        assert!(!b.exists());
        let quarantine = temp.path().join("duplicates");
        assert!(quarantine.join("b.png").exists());
        assert!(quarantine.join("b.txt").exists());
        assert_eq!(summary.moved_by_layer.get("exact"), Some(&1));
    }

    #[test]
    fn second_unattended_run_finds_nothing() {
        let temp = TempDir::new().unwrap();
        let a = save_png(temp.path(), "a.png", 1);
        let b = temp.path().join("b.png");
        fs::copy(&a, &b).unwrap();

        let first = engine(temp.path(), Mode::Unattended)
            .run(&mut ApplyAll)
            .unwrap();
        assert_eq!(first.moved, 1);

        let second = engine(temp.path(), Mode::Unattended)
            .run(&mut ApplyAll)
            .unwrap();

        assert_eq!(second.groups_formed, 0);
        assert_eq!(second.moved, 0);
    }

    #[test]
    fn skip_group_leaves_members_untouched() {
        let temp = TempDir::new().unwrap();
        let a = save_png(temp.path(), "a.png", 1);
        let b = temp.path().join("b.png");
        fs::copy(&a, &b).unwrap();

        let mut prompt = Scripted::new(&[Decision::SkipGroup]);
        let summary = engine(temp.path(), Mode::Interactive)
            .run(&mut prompt)
            .unwrap();

        assert_eq!(summary.skipped_groups, 1);
        assert_eq!(summary.moved, 0);
        assert!(a.exists());
        assert!(b.exists());
    }

    #[test]
    fn abort_stops_before_any_application() {
        let temp = TempDir::new().unwrap();
        let a = save_png(temp.path(), "a.png", 1);
        let b = temp.path().join("b.png");
        fs::copy(&a, &b).unwrap();

        let mut prompt = Scripted::new(&[Decision::Abort]);
        let summary = engine(temp.path(), Mode::Interactive)
            .run(&mut prompt)
            .unwrap();

        assert!(summary.aborted);
        assert_eq!(summary.moved, 0);
        assert!(a.exists());
        assert!(b.exists());
    }

    #[test]
    fn apply_layer_commits_the_rest_without_prompts() {
        let temp = TempDir::new().unwrap();
        // Two independent exact groups in the same layer
        let a = save_png(temp.path(), "a.png", 1);
        let a2 = temp.path().join("a2.png");
        fs::copy(&a, &a2).unwrap();
        let c = save_png(temp.path(), "c.png", 200);
        let c2 = temp.path().join("c2.png");
        fs::copy(&c, &c2).unwrap();

        let mut prompt = Scripted::new(&[Decision::ApplyLayer]);
        let summary = engine(temp.path(), Mode::Interactive)
            .run(&mut prompt)
            .unwrap();

        assert_eq!(prompt.reviews, 1, "one prompt covers the whole layer");
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.moved, 2);
    }

    #[test]
    fn unattended_mode_never_prompts() {
        let temp = TempDir::new().unwrap();
        let a = save_png(temp.path(), "a.png", 1);
        let b = temp.path().join("b.png");
        fs::copy(&a, &b).unwrap();

        let mut prompt = Scripted::new(&[]);
        engine(temp.path(), Mode::Unattended)
            .run(&mut prompt)
            .unwrap();

        assert_eq!(prompt.reviews, 0);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let result = engine(Path::new("/nonexistent/dataset"), Mode::Unattended).run(&mut ApplyAll);
        assert!(result.is_err());
    }

    #[test]
    fn quarantine_defaults_under_the_dataset() {
        let engine = DedupeEngine::builder("/data/train").build();
        assert_eq!(engine.quarantine(), Path::new("/data/train/duplicates"));
    }
}
