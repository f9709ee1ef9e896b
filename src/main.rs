use anyhow::Result;
use batchminer::cli::{Cli, OutputFormat};
use batchminer::config::MinerConfig;
use batchminer::json_output::JsonOutput;
use batchminer::pipeline::{self, RunSummary};
use batchminer::{csv_output, ingest};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber, writing to stderr
///
/// `--debug` forces TRACE, `--quiet` drops to WARN; otherwise `RUST_LOG`
/// applies, falling back to INFO.
fn init_tracing(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_text_summary(summary: &RunSummary) {
    println!("=== Batch Mining Summary ===");
    for segment in &summary.segments {
        println!(
            "{}: {} traces, {} batches, {}% batched",
            segment.key(),
            segment.total_traces(),
            segment.batches().len(),
            csv_output::format_value(segment.batch_percentage())
        );
    }
    println!("─────────────────────────────────────────");
    println!("Segments analysed: {}", summary.segments_analysed());
    if !summary.missing.is_empty() {
        let missing: Vec<_> = summary.missing.iter().map(|k| k.as_str()).collect();
        println!(
            "Segments missing: {} ({})",
            missing.len(),
            missing.join(", ")
        );
    }
    println!("Batches found: {}", summary.batches_found());
    println!(
        "Total execution time: {}",
        pipeline::format_elapsed(summary.elapsed)
    );
}

fn print_json_summary(summary: &RunSummary, config: &MinerConfig) -> Result<()> {
    let zone = config.zone()?;
    let mut output = JsonOutput::new(
        config.min_batch_size,
        config.policy.as_str(),
        config.time_unit.as_str(),
    );
    for segment in &summary.segments {
        output.add_segment(segment, &zone);
    }
    for key in &summary.missing {
        output.add_missing(key.as_str());
    }
    output.set_elapsed_ms(u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX));
    println!("{}", output.to_json()?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug, args.quiet);

    let mut config = match &args.config {
        Some(path) => MinerConfig::from_toml(path)?,
        None => MinerConfig::default(),
    };
    args.apply(&mut config);

    if args.list_segments {
        for key in ingest::list_segments(&config.input_dir)? {
            println!("{key}");
        }
        return Ok(());
    }

    let summary = pipeline::run(&config)?;

    match args.format {
        OutputFormat::Text => print_text_summary(&summary),
        OutputFormat::Json => print_json_summary(&summary, &config)?,
    }

    Ok(())
}
