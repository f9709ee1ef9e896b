//! JSON output format for batch mining runs
//!
//! `--format json` prints one document describing every analysed segment and
//! its batches. Undefined statistics are `null`; populations a statistic is
//! not reported for are omitted.

use crate::clock::ReferenceZone;
use crate::segment::Segment;
use crate::stats::{ExtendedStats, Summary};
use serde::{Deserialize, Serialize};

/// Mean and standard deviation, `null` where undefined
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
}

impl From<Summary> for JsonSummary {
    fn from(summary: Summary) -> Self {
        Self {
            mean: defined(summary.mean),
            stddev: defined(summary.stddev),
        }
    }
}

/// Waiting-time statistics of one batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JsonWaiting {
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl From<ExtendedStats> for JsonWaiting {
    fn from(stats: ExtendedStats) -> Self {
        Self {
            mean: defined(stats.mean),
            stddev: defined(stats.stddev),
            min: defined(stats.min),
            max: defined(stats.max),
        }
    }
}

fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

/// A detected batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBatch {
    /// 1-based position in exit-key order
    pub index: usize,
    pub size: usize,
    /// Departure, epoch milliseconds
    pub departure_ms: i64,
    /// Departure in the reference zone (`MM-dd-yy HH:mm`)
    pub departure: String,
    pub case_ids: Vec<String>,
    pub inter_arrival: JsonSummary,
    pub waiting: JsonWaiting,
}

/// Statistics of one segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSegment {
    pub key: String,
    pub traces: usize,
    pub batched: usize,
    pub non_batched: usize,
    /// Percentage of traces that are batched
    pub batching_percentage: f64,
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<JsonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_interval: Option<JsonSummary>,
    pub inter_arrival: JsonSummary,
    pub waiting: JsonSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batched_inter_arrival: Option<JsonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_batched_inter_arrival: Option<JsonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intra_batch_inter_arrival: Option<JsonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batched_waiting: Option<JsonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_batched_waiting: Option<JsonSummary>,
    pub batches: Vec<JsonBatch>,
}

impl JsonSegment {
    pub fn from_segment(segment: &Segment, zone: &ReferenceZone) -> Self {
        let stats = segment.statistics();
        let batches = segment
            .batches()
            .iter()
            .enumerate()
            .map(|(i, batch)| JsonBatch {
                index: i + 1,
                size: batch.size(),
                departure_ms: batch.departure(),
                departure: zone.format(batch.departure()),
                case_ids: batch.case_ids().to_vec(),
                inter_arrival: batch.arrival_stats().into(),
                waiting: batch.waiting_stats().into(),
            })
            .collect();

        Self {
            key: segment.key().to_string(),
            traces: segment.total_traces(),
            batched: segment.batched_count(),
            non_batched: segment.non_batched_count(),
            batching_percentage: segment.batch_percentage(),
            start_ms: segment.start(),
            end_ms: segment.end(),
            batch_size: stats.batch_size.map(Into::into),
            batch_interval: stats.batch_interval.map(Into::into),
            inter_arrival: stats.all_arrival.into(),
            waiting: stats.all_waiting.into(),
            batched_inter_arrival: stats.batched_arrival.map(Into::into),
            non_batched_inter_arrival: stats.non_batched_arrival.map(Into::into),
            intra_batch_inter_arrival: stats.intra_batch_arrival.map(Into::into),
            batched_waiting: stats.batched_waiting.map(Into::into),
            non_batched_waiting: stats.non_batched_waiting.map(Into::into),
            batches,
        }
    }
}

/// Run totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunSummary {
    pub segments_analysed: usize,
    pub segments_missing: usize,
    pub batches_found: usize,
    pub elapsed_ms: u64,
}

/// Complete JSON document for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub min_batch_size: usize,
    pub policy: String,
    pub time_unit: String,
    pub segments: Vec<JsonSegment>,
    /// Selected segments with no traces in the input
    pub missing_segments: Vec<String>,
    pub summary: JsonRunSummary,
}

impl JsonOutput {
    pub fn new(min_batch_size: usize, policy: impl Into<String>, time_unit: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "batchminer-json-v1".to_string(),
            min_batch_size,
            policy: policy.into(),
            time_unit: time_unit.into(),
            segments: Vec::new(),
            missing_segments: Vec::new(),
            summary: JsonRunSummary {
                segments_analysed: 0,
                segments_missing: 0,
                batches_found: 0,
                elapsed_ms: 0,
            },
        }
    }

    pub fn add_segment(&mut self, segment: &Segment, zone: &ReferenceZone) {
        self.summary.segments_analysed += 1;
        self.summary.batches_found += segment.batches().len();
        self.segments.push(JsonSegment::from_segment(segment, zone));
    }

    pub fn add_missing(&mut self, key: impl Into<String>) {
        self.summary.segments_missing += 1;
        self.missing_segments.push(key.into());
    }

    pub fn set_elapsed_ms(&mut self, elapsed_ms: u64) {
        self.summary.elapsed_ms = elapsed_ms;
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeUnit;
    use crate::detect::BatchDetector;
    use crate::segment::SegmentKey;
    use crate::trace::{ExitPolicy, Trace};

    const HOUR: i64 = 3_600_000;

    fn segment(spans: &[(&str, i64, i64)], min: usize) -> Segment {
        let zone = ReferenceZone::utc();
        let traces = spans
            .iter()
            .map(|&(id, entry, exit)| Trace::new(id, entry * HOUR, (exit - entry) * HOUR, &zone).unwrap())
            .collect();
        let detector = BatchDetector::new(min, ExitPolicy::Exact, TimeUnit::Hours).unwrap();
        Segment::analyze(SegmentKey::parse("A:B").unwrap(), traces, &detector).unwrap()
    }

    #[test]
    fn test_json_output_creation() {
        let output = JsonOutput::new(20, "exact", "hours");
        assert_eq!(output.format, "batchminer-json-v1");
        assert!(output.segments.is_empty());
        assert_eq!(output.summary.batches_found, 0);
    }

    #[test]
    fn test_add_segment_updates_summary() {
        let mut output = JsonOutput::new(2, "exact", "hours");
        let seg = segment(&[("a", 0, 4), ("b", 1, 4), ("c", 2, 6)], 2);
        output.add_segment(&seg, &ReferenceZone::utc());
        output.add_missing("X:Y");

        assert_eq!(output.summary.segments_analysed, 1);
        assert_eq!(output.summary.segments_missing, 1);
        assert_eq!(output.summary.batches_found, 1);

        let batch = &output.segments[0].batches[0];
        assert_eq!(batch.index, 1);
        assert_eq!(batch.case_ids, ["a", "b"]);
        assert_eq!(batch.departure, "01-01-70 04:00");
        assert_eq!(batch.waiting.max, Some(4.0));
    }

    #[test]
    fn test_json_serialization() {
        let mut output = JsonOutput::new(2, "rounded", "minutes");
        output.add_segment(&segment(&[("a", 0, 4), ("b", 1, 4)], 2), &ReferenceZone::utc());
        output.set_elapsed_ms(1500);

        let json = output.to_json().unwrap();
        assert!(json.contains("\"format\": \"batchminer-json-v1\""));
        assert!(json.contains("\"policy\": \"rounded\""));
        assert!(json.contains("\"key\": \"A:B\""));
        assert!(json.contains("\"elapsed_ms\": 1500"));
    }

    #[test]
    fn test_unreported_populations_omitted() {
        // one batch, every trace batched
        let seg = segment(&[("a", 0, 4), ("b", 1, 4)], 2);
        let json = serde_json::to_string(&JsonSegment::from_segment(&seg, &ReferenceZone::utc())).unwrap();
        assert!(!json.contains("batch_interval"));
        assert!(!json.contains("non_batched_waiting"));
        assert!(json.contains("batched_waiting"));
    }

    #[test]
    fn test_undefined_statistic_is_null() {
        // singleton batch: no intra-batch gaps
        let seg = segment(&[("a", 0, 4)], 1);
        let json = serde_json::to_string(&JsonSegment::from_segment(&seg, &ReferenceZone::utc())).unwrap();
        assert!(json.contains("\"inter_arrival\":{\"mean\":null,\"stddev\":null}"));
    }
}
