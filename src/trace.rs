//! One case's timed traversal of a segment

use crate::clock::{ReferenceZone, TimeUnit};
use crate::error::{MinerError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which exit timestamp two traces must share to be grouped into a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Exact exit-time equality (FIFO, simultaneous completion)
    #[default]
    Exact,
    /// Exit times snapped to half-day boundaries (non-FIFO 12h window)
    Rounded,
}

impl ExitPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitPolicy::Exact => "exact",
            ExitPolicy::Rounded => "rounded",
        }
    }
}

/// A single case passing through a segment
///
/// Everything except the batch flag is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    case_id: String,
    entry: i64,
    duration: i64,
    exit: i64,
    rounded_exit: i64,
    batched: bool,
}

/// Value identity of a trace, used to tell batched from non-batched traces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceIdentity {
    pub case_id: String,
    pub entry: i64,
    pub exit: i64,
    pub duration: i64,
}

impl Trace {
    /// Build a trace from its entry time and duration (epoch milliseconds)
    pub fn new(
        case_id: impl Into<String>,
        entry: i64,
        duration: i64,
        zone: &ReferenceZone,
    ) -> Result<Self> {
        let case_id = case_id.into();
        if duration < 0 {
            return Err(MinerError::NegativeDuration { case_id, duration });
        }
        let Some(exit) = entry.checked_add(duration) else {
            return Err(MinerError::TimestampOverflow { case_id });
        };
        Ok(Self {
            case_id,
            entry,
            duration,
            exit,
            rounded_exit: zone.round_half_day(exit),
            batched: false,
        })
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn entry(&self) -> i64 {
        self.entry
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn exit(&self) -> i64 {
        self.exit
    }

    /// Exit time snapped to 11:59 or 23:59 of its local day
    pub fn rounded_exit(&self) -> i64 {
        self.rounded_exit
    }

    /// The exit timestamp compared under `policy`
    pub fn exit_key(&self, policy: ExitPolicy) -> i64 {
        match policy {
            ExitPolicy::Exact => self.exit,
            ExitPolicy::Rounded => self.rounded_exit,
        }
    }

    pub fn is_batched(&self) -> bool {
        self.batched
    }

    pub(crate) fn set_batched(&mut self, batched: bool) {
        self.batched = batched;
    }

    pub fn identity(&self) -> TraceIdentity {
        TraceIdentity {
            case_id: self.case_id.clone(),
            entry: self.entry,
            exit: self.exit,
            duration: self.duration,
        }
    }
}

/// Sort by entry time (stable)
pub fn sort_by_entry(traces: &mut [Trace]) {
    traces.sort_by_key(Trace::entry);
}

/// Sort by (exit key, entry time), the order batch detection requires
pub fn sort_for_detection(traces: &mut [Trace], policy: ExitPolicy) {
    traces.sort_by_key(|t| (t.exit_key(policy), t.entry));
}

/// Gaps between consecutive entry times, in `unit`
///
/// `traces` must already be ordered by entry time.
pub fn inter_arrival_times(traces: &[Trace], unit: TimeUnit) -> Vec<f64> {
    traces
        .windows(2)
        .map(|pair| unit.normalize(pair[1].entry.saturating_sub(pair[0].entry)))
        .collect()
}

/// Durations of every trace, in `unit`
pub fn waiting_times(traces: &[Trace], unit: TimeUnit) -> Vec<f64> {
    traces.iter().map(|t| unit.normalize(t.duration)).collect()
}
