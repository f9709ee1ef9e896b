//! CSV reports: segment statistics, batch statistics and annotated event logs
//!
//! Undefined statistics (absent populations or NaN) are written as the
//! placeholder `-` so every row keeps the same shape.

use crate::clock::ReferenceZone;
use crate::error::{MinerError, Result};
use crate::segment::Segment;
use crate::stats::Summary;
use std::io::Write;

/// Marker for a statistic that is not defined for a population
pub const PLACEHOLDER: &str = "-";

const SEGMENT_HEADER: [&str; 20] = [
    "segmentKey",
    "n",
    "BF",
    "m",
    "mu_k",
    "sigma_k",
    "mu_BI",
    "sigma_BI",
    "mu_{IA}",
    "sigma_{IA}",
    "mu_{IA_b}",
    "sigma_{IA_b}",
    "mu_{IA_nb}",
    "sigma_{IA_nb}",
    "mu_{IAIB}",
    "sigma_{IAIB}",
    "mu_{Wo_b}",
    "sigma_{Wo_b}",
    "mu_{Wo_nb}",
    "sigma_{Wo_nb}",
];

const BATCH_HEADER: [&str; 10] = [
    "segmentKey",
    "i",
    "k_i",
    "t_{bi_dep}",
    "mu_{IBIA_i}",
    "sigma{IBIA_i}",
    "mu_{Wo_bi}",
    "sigma{Wo_bi}",
    "W_{i_min}",
    "W{i_max}",
];

const LOG_HEADER: [&str; 3] = ["CaseID", "eventName", "timestamp"];

/// Render one statistic, NaN as the placeholder
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}

fn summary_fields(summary: Option<Summary>) -> [String; 2] {
    match summary {
        Some(s) => [format_value(s.mean), format_value(s.stddev)],
        None => [PLACEHOLDER.to_string(), PLACEHOLDER.to_string()],
    }
}

/// One row of the segment statistics report
#[derive(Debug, Clone, PartialEq)]
pub struct CsvSegmentRow {
    pub fields: Vec<String>,
}

impl CsvSegmentRow {
    pub fn from_segment(segment: &Segment) -> Self {
        let stats = segment.statistics();
        let mut fields = vec![
            segment.key().to_string(),
            segment.total_traces().to_string(),
            format_value(segment.batch_percentage()),
            segment.batches().len().to_string(),
        ];
        for summary in [
            stats.batch_size,
            stats.batch_interval,
            Some(stats.all_arrival),
            stats.batched_arrival,
            stats.non_batched_arrival,
            stats.intra_batch_arrival,
            stats.batched_waiting,
            stats.non_batched_waiting,
        ] {
            fields.extend(summary_fields(summary));
        }
        Self { fields }
    }
}

/// Segment statistics report, one row per segment
#[derive(Debug, Default)]
pub struct SegmentStatsOutput {
    rows: Vec<CsvSegmentRow>,
}

impl SegmentStatsOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment: &Segment) {
        self.rows.push(CsvSegmentRow::from_segment(segment));
    }

    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(SEGMENT_HEADER)?;
        for row in &self.rows {
            writer.write_record(&row.fields)?;
        }
        writer.flush().map_err(|e| MinerError::io("<segment statistics>", e))?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Batch statistics report, one row per detected batch
#[derive(Debug)]
pub struct BatchStatsOutput {
    zone: ReferenceZone,
    rows: Vec<Vec<String>>,
}

impl BatchStatsOutput {
    pub fn new(zone: ReferenceZone) -> Self {
        Self {
            zone,
            rows: Vec::new(),
        }
    }

    pub fn add_segment(&mut self, segment: &Segment) {
        for (i, batch) in segment.batches().iter().enumerate() {
            let arrival = batch.arrival_stats();
            let waiting = batch.waiting_stats();
            self.rows.push(vec![
                segment.key().to_string(),
                (i + 1).to_string(),
                batch.size().to_string(),
                self.zone.format(batch.departure()),
                format_value(arrival.mean),
                format_value(arrival.stddev),
                format_value(waiting.mean),
                format_value(waiting.stddev),
                format_value(waiting.min),
                format_value(waiting.max),
            ]);
        }
    }

    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(BATCH_HEADER)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| MinerError::io("<batch statistics>", e))?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Event log of one segment with batch annotations
///
/// Every trace yields four rows: an annotated copy of its source and target
/// events (case ID suffixed ` (copy)`, activity suffixed ` (batch)` or
/// ` (no batch)`), then the plain source and target events.
#[derive(Debug)]
pub struct AnnotatedLog<'a> {
    segment: &'a Segment,
    zone: ReferenceZone,
}

impl<'a> AnnotatedLog<'a> {
    pub fn new(segment: &'a Segment, zone: ReferenceZone) -> Self {
        Self { segment, zone }
    }

    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        let (source, target) = self.segment.key().activities()?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(LOG_HEADER)?;

        for trace in self.segment.traces() {
            let annotation = if trace.is_batched() {
                "(batch)"
            } else {
                "(no batch)"
            };
            let copy_id = format!("{} (copy)", trace.case_id());
            let entered = self.zone.format(trace.entry());
            let exited = self.zone.format(trace.exit());

            writer.write_record([&copy_id, &format!("{source} {annotation}"), &entered])?;
            writer.write_record([&copy_id, &format!("{target} {annotation}"), &exited])?;
            writer.write_record([trace.case_id(), source.as_str(), entered.as_str()])?;
            writer.write_record([trace.case_id(), target.as_str(), exited.as_str()])?;
        }
        writer.flush().map_err(|e| MinerError::io("<annotated log>", e))?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
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

    fn segment(key: &str, spans: &[(&str, i64, i64)], min: usize) -> Segment {
        let zone = ReferenceZone::utc();
        let traces = spans
            .iter()
            .map(|&(id, entry, exit)| Trace::new(id, entry * HOUR, (exit - entry) * HOUR, &zone).unwrap())
            .collect();
        let detector = BatchDetector::new(min, ExitPolicy::Exact, TimeUnit::Hours).unwrap();
        Segment::analyze(SegmentKey::parse(key).unwrap(), traces, &detector).unwrap()
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(f64::NAN), "-");
    }

    #[test]
    fn test_segment_header() {
        let csv = SegmentStatsOutput::new().to_csv().unwrap();
        assert_eq!(
            csv.lines().next().unwrap(),
            "segmentKey,n,BF,m,mu_k,sigma_k,mu_BI,sigma_BI,mu_{IA},sigma_{IA},mu_{IA_b},sigma_{IA_b},mu_{IA_nb},sigma_{IA_nb},mu_{IAIB},sigma_{IAIB},mu_{Wo_b},sigma_{Wo_b},mu_{Wo_nb},sigma_{Wo_nb}"
        );
    }

    #[test]
    fn test_segment_row_without_batches_uses_placeholders() {
        let seg = segment("A:B", &[("a", 0, 1), ("b", 1, 3), ("c", 2, 5)], 2);
        let row = CsvSegmentRow::from_segment(&seg);
        assert_eq!(row.fields.len(), 20);
        assert_eq!(&row.fields[..4], &["A:B", "3", "0", "0"]);
        assert_eq!(&row.fields[4..8], &["-", "-", "-", "-"]);
        // all-case inter-arrival: gaps 1,1
        assert_eq!(&row.fields[8..10], &["1", "0"]);
        assert_eq!(&row.fields[10..12], &["-", "-"]);
        assert_ne!(row.fields[12], "-");
        assert_eq!(&row.fields[14..18], &["-", "-", "-", "-"]);
        // non-batched waiting: 1,2,3
        assert_eq!(row.fields[18], "2");
    }

    #[test]
    fn test_segment_row_all_batched() {
        let seg = segment("A:B", &[("a", 0, 4), ("b", 2, 4)], 2);
        let row = CsvSegmentRow::from_segment(&seg);
        assert_eq!(row.fields[2], "100");
        assert_eq!(&row.fields[4..6], &["2", "0"]);
        // a single batch has no interval
        assert_eq!(&row.fields[6..8], &["-", "-"]);
        assert_eq!(&row.fields[12..14], &["-", "-"]);
        assert_eq!(&row.fields[14..16], &["2", "0"]);
        assert_eq!(&row.fields[18..20], &["-", "-"]);
    }

    #[test]
    fn test_segment_key_with_comma_is_quoted() {
        let seg = segment("Check, then:Pay", &[("a", 0, 1)], 5);
        let mut out = SegmentStatsOutput::new();
        out.add_segment(&seg);
        let csv = out.to_csv().unwrap();
        assert!(csv.contains("\"Check, then:Pay\",1,"));
    }

    #[test]
    fn test_batch_rows() {
        let seg = segment(
            "A:B",
            &[("a", 0, 10), ("b", 2, 10), ("c", 4, 10), ("d", 5, 20), ("e", 6, 20)],
            2,
        );
        let mut out = BatchStatsOutput::new(ReferenceZone::utc());
        out.add_segment(&seg);
        let csv = out.to_csv().unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "segmentKey,i,k_i,t_{bi_dep},mu_{IBIA_i},sigma{IBIA_i},mu_{Wo_bi},sigma{Wo_bi},W_{i_min},W{i_max}"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("A:B,1,3,01-01-70 10:00,2,0,8,"));
        assert!(lines[1].ends_with(",6,10"));
        assert!(lines[2].starts_with("A:B,2,2,01-01-70 20:00,1,0,14.5,0.5,14,15"));
    }

    #[test]
    fn test_annotated_log_rows() {
        let seg = segment("Send/Out:Done", &[("a", 0, 4), ("b", 1, 4), ("c", 2, 6)], 2);
        let csv = AnnotatedLog::new(&seg, ReferenceZone::utc()).to_csv().unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + 3 * 4);
        assert_eq!(lines[0], "CaseID,eventName,timestamp");
        assert_eq!(lines[1], "a (copy),Send_Out (batch),01-01-70 00:00");
        assert_eq!(lines[2], "a (copy),Done (batch),01-01-70 04:00");
        assert_eq!(lines[3], "a,Send_Out,01-01-70 00:00");
        assert_eq!(lines[4], "a,Done,01-01-70 04:00");
        assert_eq!(lines[9], "c (copy),Send_Out (no batch),01-01-70 02:00");
    }
}
