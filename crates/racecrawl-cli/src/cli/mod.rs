//! CLI for the racecrawl results crawler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use racecrawl_core::config;
use std::path::PathBuf;

use commands::{run_fetch, run_stats};

/// Top-level CLI for the racecrawl results crawler.
#[derive(Debug, Parser)]
#[command(name = "racecrawl")]
#[command(about = "racecrawl: concurrent race-results crawler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch all results for an event into race-<EVENT_ID>.csv.
    Fetch {
        /// Numeric event identifier on the results service.
        event_id: u64,

        /// Replace an existing output file instead of skipping the crawl.
        #[arg(long)]
        overwrite: bool,

        /// Directory for the output file (default: current directory).
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Compute percentile statistics from a fetched result file.
    Stats {
        /// Path to a race-<EVENT_ID>.csv file.
        file: PathBuf,

        /// Also print per-minute finish-time buckets.
        #[arg(long)]
        buckets: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                event_id,
                overwrite,
                out_dir,
            } => run_fetch(&cfg, event_id, overwrite, out_dir).await?,
            CliCommand::Stats { file, buckets } => run_stats(&file, buckets)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
