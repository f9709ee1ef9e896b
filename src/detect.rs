//! Batch detection over exit-ordered traces
//!
//! A single left-to-right scan groups consecutive traces whose exit keys are
//! equal into runs. Runs of at least `min_batch_size` traces become batches
//! and their members are flagged as batched.
//!
//! # Precondition
//!
//! Input must be sorted by (exit key, entry time) under the same
//! [`ExitPolicy`] the detector uses (see [`crate::trace::sort_for_detection`]).
//! Runs only break where the key changes; the scan never looks ahead, so
//! unsorted input would silently split batches. The detector verifies the
//! order up front and rejects violations with [`MinerError::UnsortedTraces`].

use crate::batch::Batch;
use crate::clock::TimeUnit;
use crate::error::{MinerError, Result};
use crate::trace::{ExitPolicy, Trace};
use std::ops::Range;

/// Partitions sorted traces into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDetector {
    min_batch_size: usize,
    policy: ExitPolicy,
    unit: TimeUnit,
}

impl BatchDetector {
    pub fn new(min_batch_size: usize, policy: ExitPolicy, unit: TimeUnit) -> Result<Self> {
        if min_batch_size == 0 {
            return Err(MinerError::InvalidMinBatchSize(min_batch_size));
        }
        Ok(Self {
            min_batch_size,
            policy,
            unit,
        })
    }

    pub fn min_batch_size(&self) -> usize {
        self.min_batch_size
    }

    pub fn policy(&self) -> ExitPolicy {
        self.policy
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Detect batches, marking every member trace as batched
    ///
    /// Flags from any earlier pass are cleared first, so afterwards a trace
    /// is flagged exactly when it belongs to one of the returned batches.
    /// Returns batches in exit-key order. An empty result is valid (no run
    /// reached the minimum size); an empty input is an error.
    pub fn detect(&self, traces: &mut [Trace]) -> Result<Vec<Batch>> {
        if traces.is_empty() {
            return Err(MinerError::EmptyTraceList);
        }
        self.check_sorted(traces)?;
        for trace in traces.iter_mut() {
            trace.set_batched(false);
        }

        let mut batches = Vec::new();
        let mut run_start = 0;

        for i in 1..traces.len() {
            if !self.extends_run(&traces[i - 1], &traces[i]) {
                self.finalize(traces, run_start..i, &mut batches)?;
                run_start = i;
            }
        }
        let end = traces.len();
        self.finalize(traces, run_start..end, &mut batches)?;

        tracing::debug!(
            traces = traces.len(),
            batches = batches.len(),
            min_batch_size = self.min_batch_size,
            policy = ?self.policy,
            "batch detection finished"
        );
        Ok(batches)
    }

    fn extends_run(&self, previous: &Trace, current: &Trace) -> bool {
        current.exit_key(self.policy) == previous.exit_key(self.policy)
            && current.entry() >= previous.entry()
    }

    fn finalize(
        &self,
        traces: &mut [Trace],
        run: Range<usize>,
        batches: &mut Vec<Batch>,
    ) -> Result<()> {
        if run.len() < self.min_batch_size {
            return Ok(());
        }
        let batch = Batch::new(traces, run.clone(), self.unit)?;
        for trace in &mut traces[run] {
            trace.set_batched(true);
        }
        tracing::trace!(
            index = batches.len() + 1,
            size = batch.size(),
            departure = batch.departure(),
            "batch detected"
        );
        batches.push(batch);
        Ok(())
    }

    fn check_sorted(&self, traces: &[Trace]) -> Result<()> {
        let key = |t: &Trace| (t.exit_key(self.policy), t.entry());
        match traces.windows(2).position(|pair| key(&pair[0]) > key(&pair[1])) {
            Some(i) => Err(MinerError::UnsortedTraces { index: i + 1 }),
            None => Ok(()),
        }
    }
}
