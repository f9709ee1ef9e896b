//! A detected batch and its intra-batch statistics

use crate::clock::TimeUnit;
use crate::error::{MinerError, Result};
use crate::stats::{ExtendedStats, Summary};
use crate::trace::{self, Trace};
use std::ops::Range;

/// A maximal run of traces sharing one exit key, of at least the minimum size
///
/// Members are not copied: a batch records the index range of its run inside
/// the segment's detection-ordered trace list. All derived values are
/// computed once, when the detector builds the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    members: Range<usize>,
    case_ids: Vec<String>,
    inter_arrival_times: Vec<f64>,
    waiting_times: Vec<f64>,
    arrival: Summary,
    waiting: ExtendedStats,
    departure: i64,
    earliest_entry: i64,
    latest_entry: i64,
}

impl Batch {
    /// Build a batch from the run `traces[members]`
    ///
    /// The run must be ordered by entry time, which holds for any run the
    /// detector produces. An empty or out-of-range run is rejected.
    pub(crate) fn new(traces: &[Trace], members: Range<usize>, unit: TimeUnit) -> Result<Self> {
        let run = match traces.get(members.clone()) {
            Some(run) if !run.is_empty() => run,
            _ => {
                return Err(MinerError::BatchOutOfBounds {
                    start: members.start,
                    end: members.end,
                    len: traces.len(),
                })
            }
        };

        let inter_arrival_times = trace::inter_arrival_times(run, unit);
        let waiting_times = trace::waiting_times(run, unit);

        // Under the rounded policy exact exits can differ; the batch departs
        // when its last member leaves.
        let departure = run.iter().map(Trace::exit).max().unwrap_or_default();
        let earliest_entry = run.iter().map(Trace::entry).min().unwrap_or_default();
        let latest_entry = run.iter().map(Trace::entry).max().unwrap_or_default();

        Ok(Self {
            case_ids: run.iter().map(|t| t.case_id().to_string()).collect(),
            arrival: Summary::of(&inter_arrival_times),
            waiting: ExtendedStats::of(&waiting_times),
            members,
            inter_arrival_times,
            waiting_times,
            departure,
            earliest_entry,
            latest_entry,
        })
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Index range of the members in the segment's trace list
    pub fn member_range(&self) -> Range<usize> {
        self.members.clone()
    }

    /// Member traces, resolved against the list the batch was detected in
    ///
    /// `None` when `traces` is too short to hold the batch's range.
    pub fn members<'a>(&self, traces: &'a [Trace]) -> Option<&'a [Trace]> {
        traces.get(self.members.clone())
    }

    pub fn case_ids(&self) -> &[String] {
        &self.case_ids
    }

    /// Entry-time gaps between consecutive members
    pub fn inter_arrival_times(&self) -> &[f64] {
        &self.inter_arrival_times
    }

    /// Member durations
    pub fn waiting_times(&self) -> &[f64] {
        &self.waiting_times
    }

    pub fn arrival_stats(&self) -> Summary {
        self.arrival
    }

    pub fn waiting_stats(&self) -> ExtendedStats {
        self.waiting
    }

    /// Exact exit timestamp of the batch (latest member exit)
    pub fn departure(&self) -> i64 {
        self.departure
    }

    pub fn earliest_entry(&self) -> i64 {
        self.earliest_entry
    }

    pub fn latest_entry(&self) -> i64 {
        self.latest_entry
    }
}
