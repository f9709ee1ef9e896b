//! batchminer - batch processing detection in process event logs
//!
//! Event logs are pre-split into segments: every case that passes from a
//! source activity to a target activity contributes one trace with its
//! entry and exit times. Cases of one segment that leave at the same moment
//! (or, under the rounded policy, in the same half day) form a batch once
//! there are at least `min_batch_size` of them. Each segment is reported
//! with its batching percentage and with arrival and waiting statistics
//! split into batched and non-batched populations.
//!
//! ```
//! use batchminer::clock::{ReferenceZone, TimeUnit};
//! use batchminer::detect::BatchDetector;
//! use batchminer::segment::{Segment, SegmentKey};
//! use batchminer::trace::{ExitPolicy, Trace};
//!
//! let zone = ReferenceZone::utc();
//! let traces = vec![
//!     Trace::new("c1", 0, 10, &zone).unwrap(),
//!     Trace::new("c2", 2, 8, &zone).unwrap(),
//!     Trace::new("c3", 4, 9, &zone).unwrap(),
//! ];
//! let detector = BatchDetector::new(2, ExitPolicy::Exact, TimeUnit::Millis).unwrap();
//! let segment = Segment::analyze(SegmentKey::parse("Pick:Ship").unwrap(), traces, &detector).unwrap();
//!
//! assert_eq!(segment.batches().len(), 1);
//! assert_eq!(segment.batched_count(), 2);
//! ```

pub mod batch;
pub mod cli;
pub mod clock;
pub mod config;
pub mod csv_output;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod json_output;
pub mod pipeline;
pub mod segment;
pub mod stats;
pub mod trace;
