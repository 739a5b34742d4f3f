//! CLI type definitions
//!
//! This module contains the clap structure that defines the CLI interface.

use clap::Parser;
use std::path::PathBuf;

use crate::domain::models::{Config, UnitKind};

#[derive(Parser, Debug, Default)]
#[command(name = "deltamin")]
#[command(about = "Minimize a failure-inducing input with delta debugging", long_about = None)]
#[command(version)]
pub struct Cli {
    /// File holding the failure-inducing input
    pub file_path: Option<PathBuf>,

    /// Unit of reduction: char, byte, line or token
    #[arg(short, long)]
    pub unit: Option<UnitKind>,

    /// Regex marking input as failing (defaults to an opening <SELECT ...> tag)
    #[arg(short, long, conflicts_with = "command")]
    pub pattern: Option<String>,

    /// Oracle program and its arguments; receives the candidate on stdin.
    /// Must be the last option.
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "PROG ARGS")]
    pub command: Vec<String>,

    /// Working directory of the oracle command (default: current directory)
    #[arg(long, value_name = "DIR", requires = "command")]
    pub command_dir: Option<PathBuf>,

    /// Exit code of the oracle command that marks a failure (default: any non-zero)
    #[arg(long, value_name = "CODE", requires = "command")]
    pub fail_exit_code: Option<i32>,

    /// Starting granularity and floor after each reduction
    #[arg(long, value_name = "N")]
    pub min_granularity: Option<usize>,

    /// Oracle calls allowed in flight at once
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-call oracle timeout; a timed-out call counts as passing
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Do not remember verdicts of already tested candidates
    #[arg(long)]
    pub no_cache: bool,

    /// Configuration file (defaults to ./deltamin.yaml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Apply command-line flags on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        let reduction = &mut config.reduction;
        if let Some(unit) = self.unit {
            reduction.unit = unit;
        }
        if let Some(n) = self.min_granularity {
            reduction.min_granularity = n;
        }
        if let Some(jobs) = self.jobs {
            reduction.max_workers = jobs;
        }
        if let Some(ms) = self.timeout_ms {
            reduction.oracle_timeout_ms = Some(ms);
        }
        if self.no_cache {
            reduction.cache_verdicts = false;
        }
    }
}
