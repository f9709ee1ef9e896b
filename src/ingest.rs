//! Trace ingestion from per-segment CSV files
//!
//! Input directories hold one or more CSV files per segment, named
//! `<source>!<target>.csv`. Each row is `caseID,segmentLabel,entryMillis,durationMillis`
//! with no required header; rows whose label differs from the requested
//! segment (including any header row) are skipped.

use crate::clock::ReferenceZone;
use crate::error::{MinerError, Result};
use crate::segment::SegmentKey;
use crate::trace::Trace;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A validated input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub case_id: String,
    pub segment: String,
    pub entry_millis: i64,
    pub duration_millis: i64,
}

impl TraceRecord {
    /// Parse the named fields of a raw CSV row
    ///
    /// `path` and `line` only feed error messages.
    pub fn from_record(record: &StringRecord, path: &Path, line: u64) -> Result<Self> {
        if record.len() < 4 {
            return Err(MinerError::MalformedRow {
                path: path.to_path_buf(),
                line,
                found: record.len(),
            });
        }
        let integer = |index: usize, field: &'static str| -> Result<i64> {
            let raw = &record[index];
            raw.trim().parse::<i64>().map_err(|_| MinerError::Parse {
                path: path.to_path_buf(),
                line,
                field,
                value: raw.to_string(),
            })
        };
        Ok(Self {
            case_id: record[0].to_string(),
            segment: record[1].to_string(),
            entry_millis: integer(2, "entryTimeMillis")?,
            duration_millis: integer(3, "durationMillis")?,
        })
    }

    pub fn into_trace(self, zone: &ReferenceZone) -> Result<Trace> {
        Trace::new(self.case_id, self.entry_millis, self.duration_millis, zone)
    }
}

/// Inclusive observation window, epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub start: i64,
    pub end: i64,
}

impl TimeFrame {
    /// Trace lies entirely inside the window
    pub fn contains(&self, trace: &Trace) -> bool {
        trace.entry() >= self.start && trace.exit() <= self.end
    }
}

/// Keep only traces that start and finish inside `frame`
pub fn filter_time_frame(traces: Vec<Trace>, frame: &TimeFrame) -> Vec<Trace> {
    traces.into_iter().filter(|t| frame.contains(t)).collect()
}

/// Every CSV file under `dir`, recursively, in path order
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| MinerError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| MinerError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn key_of(path: &Path) -> Option<SegmentKey> {
    let stem = path.file_stem()?.to_str()?;
    SegmentKey::from_file_stem(stem)
}

/// Segment keys encoded in the file names under `dir`, sorted and unique
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentKey>> {
    let mut keys = BTreeSet::new();
    for path in csv_files(dir)? {
        match key_of(&path) {
            Some(key) => {
                keys.insert(key);
            }
            None => tracing::debug!(path = %path.display(), "skipping file without segment key"),
        }
    }
    Ok(keys.into_iter().collect())
}

/// Files under `dir` holding traces for `key`
pub fn segment_files(dir: &Path, key: &SegmentKey) -> Result<Vec<PathBuf>> {
    Ok(csv_files(dir)?
        .into_iter()
        .filter(|path| key_of(path).as_ref() == Some(key))
        .collect())
}

/// Read the rows of one file that belong to `key`
pub fn read_segment_file(path: &Path, key: &SegmentKey, zone: &ReferenceZone) -> Result<Vec<Trace>> {
    let file = File::open(path).map_err(|e| MinerError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut traces = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let line = record.position().map_or(0, |p| p.line());
        if record.get(1).is_some_and(|label| label != key.as_str()) {
            continue;
        }
        let row = TraceRecord::from_record(&record, path, line)?;
        traces.push(row.into_trace(zone)?);
    }

    tracing::trace!(path = %path.display(), rows = traces.len(), "file ingested");
    Ok(traces)
}

/// Load every trace of `key` found under `dir`
///
/// Files are read on scoped worker threads and concatenated in path order.
/// The order of the result carries no meaning; callers sort before use.
pub fn load_segment(dir: &Path, key: &SegmentKey, zone: &ReferenceZone) -> Result<Vec<Trace>> {
    let files = segment_files(dir, key)?;

    let per_file: Vec<Result<Vec<Trace>>> = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|path| scope.spawn(move |_| read_segment_file(path, key, zone)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or(Err(MinerError::WorkerPanicked("reading input files")))
            })
            .collect()
    })
    .map_err(|_| MinerError::WorkerPanicked("reading input files"))?;

    let mut traces = Vec::new();
    for result in per_file {
        traces.extend(result?);
    }
    Ok(traces)
}
