//! CLI argument parsing for batchminer

use crate::clock::TimeUnit;
use crate::config::MinerConfig;
use crate::ingest::TimeFrame;
use crate::trace::ExitPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "batchminer")]
#[command(version)]
#[command(about = "Detect batch processing in segmented process event logs", long_about = None)]
pub struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding <source>!<target>.csv files (searched recursively)
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving Statistics/ and Logs/
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Minimum number of traces for a batch (default: 20)
    #[arg(short = 'm', long = "min-batch-size", value_name = "N")]
    pub min_batch_size: Option<usize>,

    /// Exit-time grouping: exact timestamps or half-day windows
    #[arg(long = "policy", value_enum)]
    pub policy: Option<ExitPolicy>,

    /// Reference zone offset east of UTC in minutes (default: 60)
    #[arg(long = "utc-offset", value_name = "MINUTES", allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Unit for reported durations and gaps (default: hours)
    #[arg(long = "time-unit", value_enum)]
    pub time_unit: Option<TimeUnit>,

    /// Keep only traces entering at or after this epoch-millisecond time
    #[arg(long = "from", value_name = "MILLIS", requires = "to", allow_hyphen_values = true)]
    pub from: Option<i64>,

    /// Keep only traces leaving at or before this epoch-millisecond time
    #[arg(long = "to", value_name = "MILLIS", requires = "from", allow_hyphen_values = true)]
    pub to: Option<i64>,

    /// Analyse only this segment (repeatable, e.g. -s "Create:Approve")
    #[arg(short = 's', long = "segment", value_name = "KEY")]
    pub segments: Vec<String>,

    /// Segments analysed concurrently (default: 1)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Create Statistics/ and Logs/ when missing
    #[arg(long = "create-dirs")]
    pub create_dirs: bool,

    /// Skip writing annotated per-segment event logs
    #[arg(long = "no-logs")]
    pub no_logs: bool,

    /// List the segments found in the input directory and exit
    #[arg(long = "list-segments")]
    pub list_segments: bool,

    /// Summary format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable trace-level logging (per-batch and per-trace dumps)
    #[arg(long = "debug")]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "debug")]
    pub quiet: bool,
}

impl Cli {
    /// Overlay the flags that were given on top of `config`
    pub fn apply(&self, config: &mut MinerConfig) {
        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(min) = self.min_batch_size {
            config.min_batch_size = min;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(offset) = self.utc_offset_minutes {
            config.utc_offset_minutes = offset;
        }
        if let Some(unit) = self.time_unit {
            config.time_unit = unit;
        }
        if let (Some(start), Some(end)) = (self.from, self.to) {
            config.time_frame = Some(TimeFrame { start, end });
        }
        if !self.segments.is_empty() {
            config.segments = self.segments.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.create_dirs {
            config.create_output_dirs = true;
        }
        if self.no_logs {
            config.write_logs = false;
        }
    }
}
