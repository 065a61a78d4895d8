use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use image_validator_rs::config::{default_workers, DEFAULT_BATCH_SIZE};
use image_validator_rs::logging;
use image_validator_rs::prelude::*;

/// Exit status of a scan stopped by Ctrl-C
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Format of the saved report
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ReportFormat {
    /// Plain text, same layout as the console report
    #[default]
    Text,
    /// Single JSON document
    Json,
}

#[derive(Parser)]
#[command(name = "image_validator_rs", version)]
#[command(about = "Parallel image corruption scanner written in Rust", long_about = None)]
struct Cli {
    /// Directory to scan recursively for images
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// Only log periodic progress summaries instead of every file
    #[arg(short, long)]
    quiet: bool,

    /// Number of validator workers (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Save the report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Format of the saved report
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Per-file timeout in milliseconds (0 disables the timeout)
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Files dispatched together before waiting for their verdicts
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Pause between batches in milliseconds
    #[arg(long, default_value_t = 50)]
    batch_pause_ms: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            workers: self.workers.unwrap_or_else(default_workers),
            batch_size: self.batch_size,
            batch_pause: Duration::from_millis(self.batch_pause_ms),
            verbose: !self.quiet,
            file_timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            limits: ValidationLimits::default(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let config = cli.scan_config();
    config.validate()?;

    // Set up graceful shutdown handler
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown_requested.clone();

    ctrlc::set_handler(move || {
        eprintln!("\n⚠️  Shutdown requested. Finishing current batch...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    println!("Image Validator (Rust Edition)");
    println!("Using {} worker thread(s)", config.workers);
    println!();

    let mut coordinator = ScanCoordinator::new(config).with_cancel_flag(shutdown_requested);
    let outcome = coordinator.scan(&cli.directory)?;

    let summary =
        summarize(&outcome.verdicts, outcome.total, outcome.elapsed).with_root(&outcome.root);
    print_summary(&summary)?;

    if let Some(ref output) = cli.output {
        match cli.format {
            ReportFormat::Text => write_report(output, &summary)?,
            ReportFormat::Json => write_json_report(output, &summary)?,
        }
        println!("Report saved: {}", output.display());
    }

    if !summary.is_complete() {
        warn!(
            "Scan interrupted: {} of {} images checked",
            summary.processed, summary.total
        );
        return Ok(INTERRUPTED_EXIT_CODE);
    }

    Ok(summary.exit_code())
}
