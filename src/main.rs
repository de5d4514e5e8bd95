//! # dataset-dedupe CLI
//!
//! Command-line interface for the dataset deduplication engine.
//!
//! ## Usage
//! ```bash
//! dataset-dedupe run ~/datasets/train
//! dataset-dedupe run ~/datasets/train --unattended --output json
//! ```

mod cli;

use dataset_dedupe::Result;

fn main() -> Result<()> {
    cli::run()
}
