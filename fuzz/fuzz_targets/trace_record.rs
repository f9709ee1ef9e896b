#![no_main]

use batchminer::clock::ReferenceZone;
use batchminer::ingest::TraceRecord;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as CSV rows; parsing must reject, never panic
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let zone = ReferenceZone::default();

    for (line, record) in reader.records().enumerate() {
        let Ok(record) = record else { continue };
        if let Ok(row) = TraceRecord::from_record(&record, Path::new("fuzz.csv"), line as u64) {
            let _ = row.into_trace(&zone);
        }
    }
});
