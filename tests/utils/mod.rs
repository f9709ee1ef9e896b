// Shared fixtures for integration tests
//
// Builds input trees of <source>!<target>.csv files and output directories
// with the Statistics/ and Logs/ layout the miner expects.

#![allow(dead_code)]

use batchminer::clock::{ReferenceZone, TimeUnit};
use batchminer::detect::BatchDetector;
use batchminer::segment::{Segment, SegmentKey};
use batchminer::trace::{ExitPolicy, Trace};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HOUR: i64 = 3_600_000;

/// Trace with entry and exit given in hours since the epoch
pub fn trace_hours(id: &str, entry_h: f64, exit_h: f64) -> Trace {
    let entry = (entry_h * HOUR as f64) as i64;
    let exit = (exit_h * HOUR as f64) as i64;
    Trace::new(id, entry, exit - entry, &ReferenceZone::utc()).unwrap()
}

pub fn analyze(key: &str, traces: Vec<Trace>, min: usize, policy: ExitPolicy) -> Segment {
    let detector = BatchDetector::new(min, policy, TimeUnit::Hours).unwrap();
    Segment::analyze(SegmentKey::parse(key).unwrap(), traces, &detector).unwrap()
}

/// Input and output directories under one temporary root
pub struct Workspace {
    pub root: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let input = root.path().join("input");
        let output = root.path().join("output");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(output.join("Statistics")).unwrap();
        fs::create_dir_all(output.join("Logs")).unwrap();
        Self {
            root,
            input,
            output,
        }
    }

    /// Write `rows` (case, entry ms, duration ms) for `key` into `file_name`
    pub fn segment_file(&self, file_name: &str, key: &str, rows: &[(&str, i64, i64)]) -> PathBuf {
        let mut body = String::from("caseID,segment,entryTimeMillis,durationMillis\n");
        for (case, entry, duration) in rows {
            body.push_str(&format!("{case},{key},{entry},{duration}\n"));
        }
        let path = self.input.join(file_name);
        fs::write(&path, body).unwrap();
        path
    }

    pub fn read_output(&self, relative: &str) -> String {
        fs::read_to_string(self.output.join(relative)).unwrap()
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}
