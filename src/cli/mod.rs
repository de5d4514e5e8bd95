//! # CLI Module
//!
//! Command-line interface for the dataset deduplication engine.
//!
//! ## Usage
//! ```bash
//! # Review duplicates interactively
//! dataset-dedupe run ~/datasets/train
//!
//! # Apply every recommendation without prompting
//! dataset-dedupe run ~/datasets/train --unattended
//!
//! # Loosen the broad layer, JSON summary
//! dataset-dedupe run ~/datasets/train --broad 14 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use dataset_dedupe::core::resolver::format_bytes;
use dataset_dedupe::core::scanner::ScanConfig;
use dataset_dedupe::core::session::{DedupeEngine, Decision, DecisionPrompt, Mode};
use dataset_dedupe::core::{LayerThresholds, ResolutionPlan, SessionSummary};
use dataset_dedupe::error::Result;
use dataset_dedupe::events::{
    ApplyEvent, Event, EventChannel, HashEvent, LayerEvent, ResolveEvent, ScanEvent,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread;

/// Dataset Dedupe - layered duplicate detection for image datasets
#[derive(Parser, Debug)]
#[command(name = "dataset-dedupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect and resolve duplicates in a dataset directory
    Run {
        /// Directory containing the images to deduplicate
        directory: PathBuf,

        /// Apply every recommendation without prompting
        #[arg(long)]
        unattended: bool,

        /// Quarantine directory (default: <directory>/duplicates)
        #[arg(long)]
        quarantine: Option<PathBuf>,

        /// Hamming threshold for the near-exact layer
        #[arg(long, default_value = "2")]
        near_exact: u32,

        /// Hamming threshold for the structural layer
        #[arg(long, default_value = "6")]
        structural: u32,

        /// Hamming threshold for the wavelet layer
        #[arg(long, default_value = "8")]
        wavelet: u32,

        /// Hamming threshold for the broad similarity layer
        #[arg(long, default_value = "10")]
        broad: u32,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON summary for scripting
    Json,
    /// Single-line summary
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    dataset_dedupe::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            directory,
            unattended,
            quarantine,
            near_exact,
            structural,
            wavelet,
            broad,
            output,
            include_hidden,
            verbose,
        } => {
            let thresholds = LayerThresholds {
                near_exact,
                structural,
                wavelet,
                broad,
            };
            run_session(
                directory,
                unattended,
                quarantine,
                thresholds,
                output,
                include_hidden,
                verbose,
            )
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_session(
    directory: PathBuf,
    unattended: bool,
    quarantine: Option<PathBuf>,
    thresholds: LayerThresholds,
    output: OutputFormat,
    include_hidden: bool,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        let mode = if unattended {
            "[unattended]"
        } else {
            "[interactive]"
        };
        term.write_line(&format!(
            "{} {}",
            style("Dataset Dedupe").bold().cyan(),
            style(mode).dim()
        ))
        .ok();
        term.write_line(&format!("Directory: {}", display_path(&directory)))
            .ok();
        term.write_line("").ok();
    }

    let mut builder = DedupeEngine::builder(&directory)
        .mode(if unattended {
            Mode::Unattended
        } else {
            Mode::Interactive
        })
        .thresholds(thresholds)
        .scan_config(ScanConfig {
            include_hidden,
            ..Default::default()
        });
    if let Some(quarantine) = quarantine {
        builder = builder.quarantine(quarantine);
    }
    let engine = builder.build();
    let quarantine_dir = engine.quarantine().to_path_buf();

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::hidden();
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let listener_term = term.clone();
    let listener_progress = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Scan(ScanEvent::Completed { total_images, .. }) => {
                    if listener_progress.is_some() {
                        listener_term
                            .write_line(&format!("Scanned {} images", total_images))
                            .ok();
                    }
                }
                Event::Hash(HashEvent::Started { stage, total }) => {
                    if let Some(ref pb) = listener_progress {
                        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                        pb.set_length(total as u64);
                        pb.set_position(0);
                        pb.set_message(stage.to_string());
                    }
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    if let Some(ref pb) = listener_progress {
                        pb.set_position(p.completed as u64);
                    }
                }
                Event::Hash(HashEvent::Completed { .. }) => {
                    if let Some(ref pb) = listener_progress {
                        pb.finish_and_clear();
                        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
                    }
                }
                Event::Hash(HashEvent::Error { path, message }) => {
                    if verbose {
                        listener_term
                            .write_line(&format!(
                                "  {} {}: {}",
                                style("!").yellow(),
                                display_path(&path),
                                message
                            ))
                            .ok();
                    }
                }
                Event::Layer(LayerEvent::Started { layer, pool }) => {
                    if listener_progress.is_some() {
                        listener_term.write_line("").ok();
                        let label = if layer.low_confidence() {
                            style(format!("Layer: {} (low confidence)", layer)).yellow()
                        } else {
                            style(format!("Layer: {}", layer)).bold()
                        };
                        listener_term.write_line(&label.to_string()).ok();
                        listener_term
                            .write_line(&format!(
                                "{} ({} candidates)",
                                layer.description(),
                                pool
                            ))
                            .ok();
                    }
                }
                Event::Layer(LayerEvent::Completed {
                    layer: _,
                    groups_formed,
                }) => {
                    if listener_progress.is_some() && groups_formed > 0 {
                        listener_term
                            .write_line(&format!("Found {} duplicate groups", groups_formed))
                            .ok();
                    }
                }
                Event::Resolve(ResolveEvent::GroupResolved {
                    keeper, reason, ..
                }) => {
                    if verbose {
                        listener_term
                            .write_line(&format!(
                                "  keep {} ({})",
                                display_path(&keeper),
                                reason
                            ))
                            .ok();
                    }
                }
                Event::Apply(ApplyEvent::FileMoved { from, .. }) => {
                    if verbose {
                        listener_term
                            .write_line(&format!(
                                "  {} {} moved to quarantine",
                                style("->").dim(),
                                display_path(&from)
                            ))
                            .ok();
                    }
                }
                Event::Apply(ApplyEvent::PartialFailure {
                    moved, stranded, ..
                }) => {
                    listener_term
                        .write_line(&format!(
                            "  {} {} moved but {} was left behind",
                            style("!").red(),
                            display_path(&moved),
                            display_path(&stranded)
                        ))
                        .ok();
                }
                Event::Apply(ApplyEvent::Error { path, message }) => {
                    listener_term
                        .write_line(&format!(
                            "  {} failed to move {}: {}",
                            style("!").red(),
                            display_path(&path),
                            message
                        ))
                        .ok();
                }
                _ => {}
            }
        }
    });

    let summary = if unattended {
        let mut apply_all = dataset_dedupe::core::session::ApplyAll;
        engine.run_with_events(&sender, &mut apply_all)
    } else {
        let mut prompt = TermPrompt { term: term.clone() };
        engine.run_with_events(&sender, &mut prompt)
    };

    drop(sender);
    event_thread.join().ok();

    let summary = summary?;

    match output {
        OutputFormat::Pretty => print_pretty_summary(&term, &summary, &quarantine_dir),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary).unwrap());
        }
        OutputFormat::Minimal => {
            println!(
                "kept {} moved {} reclaimed {}",
                summary.kept,
                summary.moved,
                format_bytes(summary.bytes_reclaimed)
            );
        }
    }

    Ok(())
}

/// Interactive three-way decision prompt
struct TermPrompt {
    term: Term,
}

impl DecisionPrompt for TermPrompt {
    fn review(&mut self, plan: &ResolutionPlan, index: usize, total: usize) -> Decision {
        let t = &self.term;

        t.write_line("").ok();
        t.write_line(&format!(
            "  [{}/{}] {} duplicates of {}",
            index,
            total,
            plan.moves.len() + 1,
            style(short_name(&plan.keeper)).green().bold()
        ))
        .ok();
        t.write_line(&format!(
            "      {} {}",
            style("★").green(),
            display_path(&plan.keeper)
        ))
        .ok();
        for mv in &plan.moves {
            let caption = if mv.sidecar.is_some() {
                " [has caption]"
            } else {
                ""
            };
            t.write_line(&format!(
                "      {} {} ({}){}",
                style("○").dim(),
                display_path(&mv.source),
                format_bytes(mv.byte_size),
                caption
            ))
            .ok();
        }
        t.write_line(&format!("      Because: {}", plan.reason)).ok();
        t.write_line(&format!(
            "      {}",
            style("(c) apply rest of layer  (s) skip group  (x) abort").dim()
        ))
        .ok();

        loop {
            match self.term.read_char() {
                Ok('c') | Ok('C') => return Decision::ApplyLayer,
                Ok('s') | Ok('S') => return Decision::SkipGroup,
                Ok('x') | Ok('X') => return Decision::Abort,
                Ok(_) => {
                    t.write_line("      Please press c, s, or x").ok();
                }
                // No usable terminal; stop rather than guess
                Err(_) => return Decision::Abort,
            }
        }
    }
}

fn print_pretty_summary(term: &Term, summary: &SessionSummary, quarantine: &Path) {
    term.write_line("").ok();
    if summary.aborted {
        term.write_line(&format!("{} Session aborted", style("■").yellow().bold()))
            .ok();
    } else {
        term.write_line(&format!("{} Deduplication complete", style("✓").green().bold()))
            .ok();
    }
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images scanned",
        style(summary.scanned).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate groups, {} kept, {} moved",
        style(summary.groups_formed).cyan(),
        style(summary.kept).cyan(),
        style(summary.moved).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} reclaimed",
        style(format_bytes(summary.bytes_reclaimed)).yellow()
    ))
    .ok();

    if !summary.moved_by_layer.is_empty() {
        term.write_line("").ok();
        term.write_line("  By layer:").ok();
        for (layer, count) in &summary.moved_by_layer {
            term.write_line(&format!("    {:<12} {} moved", layer, count))
                .ok();
        }
    }

    if summary.skipped_groups > 0 {
        term.write_line(&format!("  {} groups skipped", summary.skipped_groups))
            .ok();
    }
    if summary.partial_failures > 0 {
        term.write_line(&format!(
            "  {} {} partial moves need attention",
            style("!").red(),
            summary.partial_failures
        ))
        .ok();
    }
    if summary.errors > 0 {
        term.write_line(&format!("  {} errors (see log)", summary.errors))
            .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!("  Quarantine: {}", display_path(quarantine)))
        .ok();
    term.write_line(&format!(
        "{}",
        style("Nothing was deleted. Review the quarantine directory before removing it.").dim()
    ))
    .ok();
}

fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}
