//! Run configuration
//!
//! Loaded from TOML with `--config`; command-line flags override individual
//! fields afterwards. Every field has a default, so a partial file is valid.
//!
//! ```toml
//! input_dir = "data/segments"
//! output_dir = "out"
//! min_batch_size = 20
//! policy = "rounded"
//! time_unit = "hours"
//! segments = ["Create:Approve"]
//!
//! [time_frame]
//! start = 1483228800000
//! end = 1514764799999
//! ```

use crate::clock::{ReferenceZone, TimeUnit};
use crate::detect::BatchDetector;
use crate::ingest::TimeFrame;
use crate::trace::ExitPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest accepted reference-zone offset, in minutes
pub const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Configuration of one batch-mining run
///
/// # Example
/// ```
/// use batchminer::config::MinerConfig;
///
/// let config = MinerConfig::default();
/// assert_eq!(config.min_batch_size, 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinerConfig {
    /// Directory scanned recursively for `<source>!<target>.csv` files
    pub input_dir: PathBuf,

    /// Reports go to `Statistics/`, annotated logs to `Logs/` below this
    pub output_dir: PathBuf,

    /// Smallest run of equal exit keys reported as a batch
    ///
    /// Default: 20
    pub min_batch_size: usize,

    /// `exact` groups identical exit times, `rounded` groups exits falling
    /// in the same half day
    pub policy: ExitPolicy,

    /// Reference zone east of UTC, used for half-day rounding and for
    /// timestamps in reports
    ///
    /// Default: 60 (GMT+1)
    pub utc_offset_minutes: i32,

    /// Unit for durations and gaps in reports
    pub time_unit: TimeUnit,

    /// Only analyse traces lying inside this window
    pub time_frame: Option<TimeFrame>,

    /// Segment keys to analyse; empty means every segment found
    pub segments: Vec<String>,

    /// Segments analysed concurrently
    pub jobs: usize,

    /// Create `Statistics/` and `Logs/` when missing instead of failing
    pub create_output_dirs: bool,

    /// Write one annotated event log per segment
    pub write_logs: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            min_batch_size: 20,
            policy: ExitPolicy::Exact,
            utc_offset_minutes: 60,
            time_unit: TimeUnit::Hours,
            time_frame: None,
            segments: Vec::new(),
            jobs: 1,
            create_output_dirs: false,
            write_logs: true,
        }
    }
}

impl MinerConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_batch_size == 0 {
            return Err("min_batch_size must be >= 1, got 0".to_string());
        }

        if self.jobs == 0 {
            return Err("jobs must be >= 1, got 0".to_string());
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(format!(
                "utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}, got {}",
                self.utc_offset_minutes
            ));
        }

        if let Some(frame) = &self.time_frame {
            if frame.start > frame.end {
                return Err(format!(
                    "time_frame start {} is after end {}",
                    frame.start, frame.end
                ));
            }
        }

        Ok(())
    }

    /// Reference zone for rounding and formatting
    pub fn zone(&self) -> Result<ReferenceZone> {
        ReferenceZone::from_offset_minutes(self.utc_offset_minutes).with_context(|| {
            format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes)
        })
    }

    pub fn detector(&self) -> Result<BatchDetector> {
        Ok(BatchDetector::new(
            self.min_batch_size,
            self.policy,
            self.time_unit,
        )?)
    }

    pub fn statistics_dir(&self) -> PathBuf {
        self.output_dir.join("Statistics")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join("Logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = MinerConfig::default();
        assert_eq!(config.min_batch_size, 20);
        assert_eq!(config.policy, ExitPolicy::Exact);
        assert_eq!(config.utc_offset_minutes, 60);
        assert_eq!(config.time_unit, TimeUnit::Hours);
        assert_eq!(config.jobs, 1);
        assert!(!config.create_output_dirs);
        assert!(config.write_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
input_dir = "in"
output_dir = "out"
min_batch_size = 5
policy = "rounded"
time_unit = "minutes"
segments = ["A:B"]

[time_frame]
start = 0
end = 1000
"#
        )?;
        file.flush()?;

        let config = MinerConfig::from_toml(file.path())?;
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert_eq!(config.min_batch_size, 5);
        assert_eq!(config.policy, ExitPolicy::Rounded);
        assert_eq!(config.time_unit, TimeUnit::Minutes);
        assert_eq!(config.segments, ["A:B"]);
        assert_eq!(config.time_frame, Some(TimeFrame { start: 0, end: 1000 }));
        // untouched fields keep their defaults
        assert_eq!(config.utc_offset_minutes, 60);
        assert!(config.write_logs);
        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(MinerConfig::from_toml_str("min_batch = 3").is_err());
    }

    #[test]
    fn test_bad_policy_rejected() {
        assert!(MinerConfig::from_toml_str("policy = \"fuzzy\"").is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = MinerConfig::from_toml("/no/such/batchminer.toml").unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/batchminer.toml"));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_min_batch_size() {
        let mut config = MinerConfig::default();
        config.min_batch_size = 0;
        assert!(config.validate().is_err());
        assert!(config.detector().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_jobs() {
        let mut config = MinerConfig::default();
        config.jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_offset() {
        let mut config = MinerConfig::default();
        config.utc_offset_minutes = 19 * 60;
        assert!(config.validate().is_err());
        config.utc_offset_minutes = -18 * 60;
        assert!(config.validate().is_ok());
        assert_eq!(config.zone().unwrap().offset_millis(), -18 * 3_600_000);
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_inverted_time_frame() {
        let mut config = MinerConfig::default();
        config.time_frame = Some(TimeFrame { start: 10, end: 5 });
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_output_subdirectories() {
        let mut config = MinerConfig::default();
        config.output_dir = PathBuf::from("out");
        assert_eq!(config.statistics_dir(), PathBuf::from("out/Statistics"));
        assert_eq!(config.logs_dir(), PathBuf::from("out/Logs"));
    }
}
