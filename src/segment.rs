//! Segments: all traces of one (source, target) activity pair
//!
//! A [`Segment`] owns its traces, the batches detected in them and the
//! batched / non-batched partition. Every aggregate is computed in
//! [`Segment::new`], in order: batches, complement, then statistics.

use crate::batch::Batch;
use crate::clock::TimeUnit;
use crate::detect::BatchDetector;
use crate::error::{MinerError, Result};
use crate::stats::Summary;
use crate::trace::{self, Trace, TraceIdentity};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a segment, `"<source>:<target>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey(String);

impl SegmentKey {
    /// Validate a key; it must split into two activity names
    pub fn parse(key: &str) -> Result<Self> {
        let parsed = Self(key.to_string());
        parsed.activities()?;
        Ok(parsed)
    }

    /// Decode an input file stem, `source!target` -> `source:target`
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let (source, target) = stem.split_once('!')?;
        Self::parse(&format!("{source}:{target}")).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Source and target activity names, sanitized for use in file names
    ///
    /// Path separators become `_`. The colon in `SRM:` is dropped first so
    /// that activity names from logs using that prefix do not split early.
    pub fn activities(&self) -> Result<(String, String)> {
        let sanitized = self.0.replace(['/', '\\'], "_").replace("SRM:", "SRM");
        match sanitized.split_once(':') {
            Some((source, target)) => Ok((source.to_string(), target.to_string())),
            None => Err(MinerError::InvalidSegmentKey(self.0.clone())),
        }
    }

    /// File name of the annotated event log for this segment
    pub fn log_file_name(&self) -> Result<String> {
        let (source, target) = self.activities()?;
        Ok(format!("segment_{source}_{target}.csv"))
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-population statistics of a segment
///
/// `None` marks a population the statistic is not reported for; reports
/// render it as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStatistics {
    /// Batch sizes (None without batches)
    pub batch_size: Option<Summary>,
    /// Departure-to-departure intervals (None with fewer than two batches)
    pub batch_interval: Option<Summary>,
    /// Inter-arrival times over all cases
    pub all_arrival: Summary,
    /// Waiting times over all cases
    pub all_waiting: Summary,
    pub batched_arrival: Option<Summary>,
    /// None when every trace is batched
    pub non_batched_arrival: Option<Summary>,
    /// Intra-batch spacings pooled over all batches
    pub intra_batch_arrival: Option<Summary>,
    pub batched_waiting: Option<Summary>,
    pub non_batched_waiting: Option<Summary>,
}

/// One segment with its batch decomposition
#[derive(Debug, Clone)]
pub struct Segment {
    key: SegmentKey,
    unit: TimeUnit,
    traces: Vec<Trace>,
    batches: Vec<Batch>,
    start: i64,
    end: i64,
    batched: Vec<usize>,
    non_batched: Vec<usize>,
    batch_percentage: f64,
    batch_sizes: Vec<f64>,
    batch_intervals: Option<Vec<f64>>,
    all_inter_arrival_times: Vec<f64>,
    all_waiting_times: Vec<f64>,
    batched_inter_arrival_times: Vec<f64>,
    batched_waiting_times: Vec<f64>,
    non_batched_inter_arrival_times: Vec<f64>,
    non_batched_waiting_times: Vec<f64>,
    intra_batch_inter_arrival_times: Vec<f64>,
    statistics: SegmentStatistics,
}

impl Segment {
    /// Run the full per-segment analysis on freshly loaded traces
    ///
    /// Computes all-case inter-arrival times in entry order, re-sorts for
    /// detection, detects batches and assembles the segment.
    pub fn analyze(key: SegmentKey, mut traces: Vec<Trace>, detector: &BatchDetector) -> Result<Self> {
        if traces.is_empty() {
            return Err(MinerError::EmptyTraceList);
        }
        trace::sort_by_entry(&mut traces);
        let all_inter_arrival_times = trace::inter_arrival_times(&traces, detector.unit());

        tracing::info!(segment = %key, traces = traces.len(), "sorting observations");
        trace::sort_for_detection(&mut traces, detector.policy());

        tracing::info!(segment = %key, "detecting batches");
        let batches = detector.detect(&mut traces)?;

        Self::new(key, traces, batches, all_inter_arrival_times, detector.unit())
    }

    /// Assemble a segment from detection output
    ///
    /// `traces` is the detection-ordered list the batches index into, with
    /// batch flags already set. `all_inter_arrival_times` is computed over
    /// the entry-ordered traces before detection. Batches whose range falls
    /// outside `traces`, or whose members are not flagged, are rejected.
    pub fn new(
        key: SegmentKey,
        traces: Vec<Trace>,
        batches: Vec<Batch>,
        all_inter_arrival_times: Vec<f64>,
        unit: TimeUnit,
    ) -> Result<Self> {
        if traces.is_empty() {
            return Err(MinerError::EmptyTraceList);
        }
        for batch in &batches {
            let range = batch.member_range();
            let members = batch.members(&traces).ok_or(MinerError::BatchOutOfBounds {
                start: range.start,
                end: range.end,
                len: traces.len(),
            })?;
            if let Some(offset) = members.iter().position(|t| !t.is_batched()) {
                return Err(MinerError::UnflaggedBatchMember {
                    index: range.start + offset,
                });
            }
        }

        let start = traces.iter().map(Trace::entry).min().unwrap_or_default();
        let end = traces.iter().map(Trace::exit).max().unwrap_or_default();

        // Batched partition: union of members, entry-ordered
        let mut batched: Vec<usize> = batches.iter().flat_map(Batch::member_range).collect();
        batched.sort_by_key(|&i| traces[i].entry());

        // Complement by value identity, not by position
        let mut non_batched: Vec<usize> = if batches.is_empty() {
            (0..traces.len()).collect()
        } else {
            let members: HashSet<TraceIdentity> =
                batched.iter().map(|&i| traces[i].identity()).collect();
            (0..traces.len())
                .filter(|&i| !members.contains(&traces[i].identity()))
                .collect()
        };
        non_batched.sort_by_key(|&i| traces[i].entry());

        let batched_count: usize = batches.iter().map(Batch::size).sum();
        let batch_percentage = 100.0 * batched_count as f64 / traces.len() as f64;

        let batch_sizes: Vec<f64> = batches.iter().map(|b| b.size() as f64).collect();
        let batch_intervals = (batches.len() >= 2).then(|| {
            batches
                .windows(2)
                .map(|pair| {
                    unit.normalize(pair[1].departure().saturating_sub(pair[0].departure()))
                })
                .collect::<Vec<_>>()
        });

        let batched_traces: Vec<Trace> = batched.iter().map(|&i| traces[i].clone()).collect();
        let non_batched_traces: Vec<Trace> =
            non_batched.iter().map(|&i| traces[i].clone()).collect();

        let all_waiting_times = trace::waiting_times(&traces, unit);
        let batched_inter_arrival_times = trace::inter_arrival_times(&batched_traces, unit);
        let batched_waiting_times = trace::waiting_times(&batched_traces, unit);
        let non_batched_inter_arrival_times = trace::inter_arrival_times(&non_batched_traces, unit);
        let non_batched_waiting_times = trace::waiting_times(&non_batched_traces, unit);
        let intra_batch_inter_arrival_times: Vec<f64> = batches
            .iter()
            .flat_map(|b| b.inter_arrival_times().iter().copied())
            .collect();

        let has_batches = !batches.is_empty();
        let has_non_batched = !non_batched.is_empty();
        let statistics = SegmentStatistics {
            batch_size: has_batches.then(|| Summary::of(&batch_sizes)),
            batch_interval: batch_intervals.as_deref().map(Summary::of),
            all_arrival: Summary::of(&all_inter_arrival_times),
            all_waiting: Summary::of(&all_waiting_times),
            batched_arrival: has_batches.then(|| Summary::of(&batched_inter_arrival_times)),
            non_batched_arrival: has_non_batched
                .then(|| Summary::of(&non_batched_inter_arrival_times)),
            intra_batch_arrival: has_batches
                .then(|| Summary::of(&intra_batch_inter_arrival_times)),
            batched_waiting: has_batches.then(|| Summary::of(&batched_waiting_times)),
            non_batched_waiting: has_non_batched.then(|| Summary::of(&non_batched_waiting_times)),
        };

        tracing::debug!(
            segment = %key,
            traces = traces.len(),
            batches = batches.len(),
            batch_percentage,
            "segment assembled"
        );

        Ok(Self {
            key,
            unit,
            traces,
            batches,
            start,
            end,
            batched,
            non_batched,
            batch_percentage,
            batch_sizes,
            batch_intervals,
            all_inter_arrival_times,
            all_waiting_times,
            batched_inter_arrival_times,
            batched_waiting_times,
            non_batched_inter_arrival_times,
            non_batched_waiting_times,
            intra_batch_inter_arrival_times,
            statistics,
        })
    }

    pub fn key(&self) -> &SegmentKey {
        &self.key
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// All traces, in detection order
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn total_traces(&self) -> usize {
        self.traces.len()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Member traces of one of this segment's batches
    ///
    /// `None` for a batch detected over a longer list.
    pub fn batch_members(&self, batch: &Batch) -> Option<&[Trace]> {
        batch.members(&self.traces)
    }

    /// Earliest entry over all traces
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Latest exit over all traces
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Batched traces, entry-ordered
    pub fn batched_traces(&self) -> Vec<&Trace> {
        self.batched.iter().map(|&i| &self.traces[i]).collect()
    }

    /// Traces outside every batch, entry-ordered
    pub fn non_batched_traces(&self) -> Vec<&Trace> {
        self.non_batched.iter().map(|&i| &self.traces[i]).collect()
    }

    pub fn batched_count(&self) -> usize {
        self.batched.len()
    }

    pub fn non_batched_count(&self) -> usize {
        self.non_batched.len()
    }

    /// Share of traces inside some batch, in percent
    pub fn batch_percentage(&self) -> f64 {
        self.batch_percentage
    }

    pub fn batch_sizes(&self) -> &[f64] {
        &self.batch_sizes
    }

    /// Intervals between consecutive batch departures; None with < 2 batches
    pub fn batch_intervals(&self) -> Option<&[f64]> {
        self.batch_intervals.as_deref()
    }

    pub fn all_inter_arrival_times(&self) -> &[f64] {
        &self.all_inter_arrival_times
    }

    pub fn all_waiting_times(&self) -> &[f64] {
        &self.all_waiting_times
    }

    pub fn batched_inter_arrival_times(&self) -> &[f64] {
        &self.batched_inter_arrival_times
    }

    pub fn batched_waiting_times(&self) -> &[f64] {
        &self.batched_waiting_times
    }

    pub fn non_batched_inter_arrival_times(&self) -> &[f64] {
        &self.non_batched_inter_arrival_times
    }

    pub fn non_batched_waiting_times(&self) -> &[f64] {
        &self.non_batched_waiting_times
    }

    /// Every batch's spacings, concatenated in batch order
    pub fn intra_batch_inter_arrival_times(&self) -> &[f64] {
        &self.intra_batch_inter_arrival_times
    }

    pub fn statistics(&self) -> &SegmentStatistics {
        &self.statistics
    }
}
