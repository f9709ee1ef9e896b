//! Error types for batch mining
//!
//! Every failure the core can produce is a variant here. Orchestration code
//! wraps these in `anyhow` with file-path context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while ingesting traces, detecting batches or writing reports
#[derive(Error, Debug)]
pub enum MinerError {
    #[error("{}:{line}: field `{field}` is not an integer: {value:?}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("{}:{line}: expected at least 4 fields, found {found}", .path.display())]
    MalformedRow { path: PathBuf, line: u64, found: usize },

    #[error("case {case_id}: negative duration {duration}")]
    NegativeDuration { case_id: String, duration: i64 },

    #[error("case {case_id}: entry time plus duration overflows the timestamp range")]
    TimestampOverflow { case_id: String },

    #[error("batch detection requires at least one trace")]
    EmptyTraceList,

    #[error("traces are not sorted by (exit key, entry time) at index {index}")]
    UnsortedTraces { index: usize },

    #[error("minimum batch size must be >= 1, got {0}")]
    InvalidMinBatchSize(usize),

    #[error("batch range {start}..{end} is empty or outside a list of {len} traces")]
    BatchOutOfBounds { start: usize, end: usize, len: usize },

    #[error("trace at index {index} lies in a batch but is not flagged as batched")]
    UnflaggedBatchMember { index: usize },

    #[error("invalid segment key {0:?} (expected \"<source>:<target>\")")]
    InvalidSegmentKey(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a worker thread panicked while {0}")]
    WorkerPanicked(&'static str),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl MinerError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for batch mining operations
pub type Result<T> = std::result::Result<T, MinerError>;
