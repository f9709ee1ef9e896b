//! End-to-end batch mining run
//!
//! ```text
//! list segments ─► queue ─► worker × jobs ─► load ─► time frame ─► analyze ─► annotated log
//!                                                                                  │
//!                         Statistics/segment_statistics.csv ◄── key order ◄────────┤
//!                         Statistics/batch_statistics.csv   ◄──────────────────────┘
//! ```
//!
//! Segments are independent, so workers pull keys from a shared lock-free
//! queue. Results are put back into key order before any report is written.

use crate::clock::ReferenceZone;
use crate::config::MinerConfig;
use crate::csv_output::{AnnotatedLog, BatchStatsOutput, SegmentStatsOutput};
use crate::detect::BatchDetector;
use crate::ingest;
use crate::segment::{Segment, SegmentKey};
use anyhow::{anyhow, bail, Context, Result};
use crossbeam::queue::SegQueue;
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

pub const SEGMENT_STATISTICS_FILE: &str = "segment_statistics.csv";
pub const BATCH_STATISTICS_FILE: &str = "batch_statistics.csv";

/// Outcome of a run
#[derive(Debug)]
pub struct RunSummary {
    /// Analysed segments, in key order
    pub segments: Vec<Segment>,
    /// Selected segments without any trace (after time-frame filtering)
    pub missing: Vec<SegmentKey>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn segments_analysed(&self) -> usize {
        self.segments.len()
    }

    pub fn batches_found(&self) -> usize {
        self.segments.iter().map(|s| s.batches().len()).sum()
    }
}

/// `"<m> min, <s> sec"`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{} min, {} sec", secs / 60, secs % 60)
}

/// Analyse every selected segment and write all reports
pub fn run(config: &MinerConfig) -> Result<RunSummary> {
    let started = Instant::now();
    config.validate().map_err(|e| anyhow!("Invalid configuration: {e}"))?;
    let zone = config.zone()?;
    let detector = config.detector()?;

    prepare_dir(&config.statistics_dir(), config.create_output_dirs)?;
    if config.write_logs {
        prepare_dir(&config.logs_dir(), config.create_output_dirs)?;
    }

    tracing::info!(input = %config.input_dir.display(), "listing segments");
    let keys = select_segments(config)?;
    tracing::info!(count = keys.len(), "segments selected");
    if config.write_logs {
        check_log_names(&keys)?;
    }

    let outcomes = analyze_all(config, &keys, &zone, &detector)?;

    let mut segments = Vec::new();
    let mut missing = Vec::new();
    for (key, outcome) in keys.into_iter().zip(outcomes) {
        match outcome.with_context(|| format!("Failed to analyse segment {key}"))? {
            Some(segment) => segments.push(segment),
            None => missing.push(key),
        }
    }

    let mut segment_report = SegmentStatsOutput::new();
    let mut batch_report = BatchStatsOutput::new(zone);
    for segment in &segments {
        segment_report.add_segment(segment);
        batch_report.add_segment(segment);
    }
    let stats_dir = config.statistics_dir();
    tracing::info!("writing segment statistics");
    write_report(&stats_dir.join(SEGMENT_STATISTICS_FILE), |out| {
        segment_report.write(out)
    })?;
    tracing::info!("writing batch statistics");
    write_report(&stats_dir.join(BATCH_STATISTICS_FILE), |out| {
        batch_report.write(out)
    })?;

    let elapsed = started.elapsed();
    tracing::info!("total execution time: {}", format_elapsed(elapsed));

    Ok(RunSummary {
        segments,
        missing,
        elapsed,
    })
}

/// Keys to analyse, sorted
///
/// With an allow-list every listed key is attempted, found on disk or not,
/// so absent ones surface as missing.
fn select_segments(config: &MinerConfig) -> Result<Vec<SegmentKey>> {
    let discovered = ingest::list_segments(&config.input_dir).with_context(|| {
        format!(
            "Failed to list segments in {}",
            config.input_dir.display()
        )
    })?;
    if config.segments.is_empty() {
        return Ok(discovered);
    }

    let mut selected = BTreeSet::new();
    for raw in &config.segments {
        selected.insert(SegmentKey::parse(raw)?);
    }
    Ok(selected.into_iter().collect())
}

/// Fail when two keys sanitise to the same annotated log file
fn check_log_names(keys: &[SegmentKey]) -> Result<()> {
    let mut seen: HashMap<String, &SegmentKey> = HashMap::new();
    for key in keys {
        let name = key.log_file_name()?;
        if let Some(first) = seen.get(&name) {
            bail!("Segments {first} and {key} would both write the annotated log {name}");
        }
        seen.insert(name, key);
    }
    Ok(())
}

type Outcome = Result<Option<Segment>>;

/// Run `analyze_segment` for every key on `config.jobs` workers
///
/// The returned outcomes line up with `keys`.
fn analyze_all(
    config: &MinerConfig,
    keys: &[SegmentKey],
    zone: &ReferenceZone,
    detector: &BatchDetector,
) -> Result<Vec<Outcome>> {
    if config.jobs == 1 || keys.len() <= 1 {
        return Ok(keys
            .iter()
            .map(|key| analyze_segment(config, key, zone, detector))
            .collect());
    }

    let queue = SegQueue::new();
    for (index, key) in keys.iter().enumerate() {
        queue.push((index, key));
    }
    let queue = &queue;
    let workers = config.jobs.min(keys.len());

    let mut finished: Vec<(usize, Outcome)> = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move |_| {
                    let mut done = Vec::new();
                    while let Some((index, key)) = queue.pop() {
                        done.push((index, analyze_segment(config, key, zone, detector)));
                    }
                    done
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("segment worker panicked")))
            .collect::<Result<Vec<_>>>()
    })
    .map_err(|_| anyhow!("segment worker panicked"))??
    .into_iter()
    .flatten()
    .collect();

    finished.sort_by_key(|(index, _)| *index);
    Ok(finished.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Load, filter and analyse one segment; `None` when it has no traces
fn analyze_segment(
    config: &MinerConfig,
    key: &SegmentKey,
    zone: &ReferenceZone,
    detector: &BatchDetector,
) -> Outcome {
    tracing::info!(segment = %key, "listing observations");
    let mut traces = ingest::load_segment(&config.input_dir, key, zone)?;
    if let Some(frame) = &config.time_frame {
        traces = ingest::filter_time_frame(traces, frame);
    }
    if traces.is_empty() {
        tracing::warn!(
            segment = %key,
            "segment is not contained in time frame or cannot be found"
        );
        return Ok(None);
    }

    let segment = Segment::analyze(key.clone(), traces, detector)?;
    for (i, batch) in segment.batches().iter().enumerate() {
        tracing::trace!(
            segment = %key,
            index = i + 1,
            size = batch.size(),
            departure = %zone.format(batch.departure()),
            cases = ?batch.case_ids(),
            "batch"
        );
    }
    for trace in segment.traces() {
        tracing::trace!(
            segment = %key,
            case = trace.case_id(),
            entry = trace.entry(),
            duration = trace.duration(),
            exit = %zone.format(trace.exit()),
            rounded_exit = %zone.format(trace.rounded_exit()),
            batched = trace.is_batched(),
            "trace"
        );
    }

    if config.write_logs {
        tracing::info!(segment = %key, "writing annotated log");
        let path = config.logs_dir().join(key.log_file_name()?);
        write_report(&path, |out| AnnotatedLog::new(&segment, *zone).write(out))?;
    }
    Ok(Some(segment))
}

fn prepare_dir(dir: &Path, create: bool) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if create {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))
    } else {
        bail!(
            "Output directory does not exist: {} (create it or enable create_output_dirs)",
            dir.display()
        )
    }
}

fn write_report<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> crate::error::Result<()>,
{
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write(&mut out).with_context(|| format!("Failed to write {}", path.display()))?;
    out.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "report written");
    Ok(())
}
