//! Report writing functionality

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::Verdict;

pub const REPORT_TITLE: &str = "IMAGE CORRUPTION SCAN REPORT";

/// Aggregated view of a finished (or interrupted) scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Scanned directory
    pub root: Option<PathBuf>,
    /// Candidates collected
    pub total: usize,
    /// Candidates that produced a verdict
    pub processed: usize,
    /// Corrupt verdicts, sorted by path
    pub corrupt: Vec<Verdict>,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn corrupt_count(&self) -> usize {
        self.corrupt.len()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Files checked per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_seconds();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }

    /// Process exit status: the corrupt count, saturated to fit a byte.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.corrupt_count()).unwrap_or(u8::MAX)
    }
}

/// Build a summary from the verdicts of a scan
///
/// # Arguments
/// * `verdicts` - One verdict per processed file, any order
/// * `total` - Number of candidates the scan collected
/// * `elapsed` - Wall time of the whole scan
pub fn summarize(verdicts: &[Verdict], total: usize, elapsed: Duration) -> ScanSummary {
    let mut corrupt: Vec<Verdict> = verdicts.iter().filter(|v| v.is_corrupt()).cloned().collect();
    corrupt.sort_by(|a, b| a.path.cmp(&b.path));

    ScanSummary {
        root: None,
        total,
        processed: verdicts.len(),
        corrupt,
        elapsed,
    }
}

/// Human-readable byte count, one decimal above a kilobyte.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Render the plain-text report
///
/// # Arguments
/// * `out` - Destination
/// * `summary` - Scan summary to render
/// * `generated` - Timestamp line; omitted from the console rendering
pub fn render_text<W: Write>(
    out: &mut W,
    summary: &ScanSummary,
    generated: Option<DateTime<Local>>,
) -> io::Result<()> {
    writeln!(out, "{}", REPORT_TITLE)?;
    writeln!(out, "{}", "=".repeat(60))?;
    if let Some(generated) = generated {
        writeln!(out, "Date: {}", generated.format("%Y-%m-%d %H:%M:%S"))?;
    }
    if let Some(root) = &summary.root {
        writeln!(out, "Directory: {}", root.display())?;
    }
    writeln!(out, "Total images: {}", summary.total)?;
    writeln!(out, "Corrupt images: {}", summary.corrupt_count())?;
    writeln!(out, "Time: {:.2}s", summary.elapsed_seconds())?;
    writeln!(out, "Speed: {:.1} img/s", summary.throughput())?;
    if !summary.is_complete() {
        writeln!(
            out,
            "Status: INCOMPLETE ({} of {} images checked)",
            summary.processed, summary.total
        )?;
    }
    writeln!(out)?;

    if summary.corrupt.is_empty() {
        writeln!(out, "✅ No corrupt images found.")?;
        return Ok(());
    }

    writeln!(out, "CORRUPT IMAGES:")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for (idx, verdict) in summary.corrupt.iter().enumerate() {
        writeln!(out, "{}. {}", idx + 1, verdict.path.display())?;
        if let Some(size) = verdict.size {
            writeln!(out, "   Size: {}", format_file_size(size))?;
        }
        writeln!(
            out,
            "   Error: {}",
            verdict.error.as_deref().unwrap_or("unknown error")
        )?;
        writeln!(out)?;
    }

    Ok(())
}

/// Print the report to stdout.
pub fn print_summary(summary: &ScanSummary) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out)?;
    render_text(&mut out, summary, None)?;
    out.flush()?;
    Ok(())
}

/// Write the plain-text report to a file
///
/// # Arguments
/// * `output_path` - Path to output file
/// * `summary` - Scan summary to write
pub fn write_report(output_path: &Path, summary: &ScanSummary) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report file {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    render_text(&mut out, summary, Some(Local::now()))?;
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: &'static str,
    generated: DateTime<Local>,
    directory: Option<&'a Path>,
    total: usize,
    processed: usize,
    corrupt_count: usize,
    elapsed_seconds: f64,
    throughput: f64,
    complete: bool,
    corrupt: &'a [Verdict],
}

/// Write the report as a JSON document.
pub fn write_json_report(output_path: &Path, summary: &ScanSummary) -> Result<()> {
    let report = JsonReport {
        title: REPORT_TITLE,
        generated: Local::now(),
        directory: summary.root.as_deref(),
        total: summary.total,
        processed: summary.processed,
        corrupt_count: summary.corrupt_count(),
        elapsed_seconds: summary.elapsed_seconds(),
        throughput: summary.throughput(),
        complete: summary.is_complete(),
        corrupt: &summary.corrupt,
    };

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report file {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &report).context("Failed to write JSON report")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn sample_verdicts() -> Vec<Verdict> {
        vec![
            Verdict::pass("/test/valid.png"),
            Verdict::fail("/test/z_broken.jpg", "Incomplete JPEG ending"),
            Verdict::fail("/test/a_empty.webp", "Empty file"),
        ]
    }

    #[test]
    fn test_summarize_counts_and_sorts() {
        let summary = summarize(&sample_verdicts(), 3, Duration::from_secs(2));
        assert_eq!(summary.corrupt_count(), 2);
        assert_eq!(summary.corrupt[0].path, PathBuf::from("/test/a_empty.webp"));
        assert!((summary.throughput() - 1.5).abs() < f64::EPSILON);
        assert!(summary.is_complete());
        assert_eq!(summary.exit_code(), 2);
    }

    #[test]
    fn test_zero_elapsed_throughput() {
        let summary = summarize(&[], 0, Duration::ZERO);
        assert_eq!(summary.throughput(), 0.0);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_saturates() {
        let verdicts: Vec<Verdict> = (0..300)
            .map(|i| Verdict::fail(format!("/x/{}.png", i), "Empty file"))
            .collect();
        let summary = summarize(&verdicts, 300, Duration::from_secs(1));
        assert_eq!(summary.exit_code(), 255);
    }

    #[test]
    fn test_write_report() {
        let temp_file = NamedTempFile::new().unwrap();
        let summary = summarize(&sample_verdicts(), 3, Duration::from_millis(1500));

        write_report(temp_file.path(), &summary).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.starts_with(REPORT_TITLE));
        assert!(content.contains(&"=".repeat(60)));
        assert!(content.contains("Date: "));
        assert!(content.contains("Total images: 3"));
        assert!(content.contains("Corrupt images: 2"));
        assert!(content.contains("Time: 1.50s"));
        assert!(content.contains("1. /test/a_empty.webp\n   Error: Empty file\n\n"));
        assert!(content.contains("2. /test/z_broken.jpg\n   Error: Incomplete JPEG ending\n"));
        assert!(!content.contains("INCOMPLETE"));
    }

    #[test]
    fn test_report_lists_directory_and_sizes() {
        let verdicts = vec![
            Verdict::fail("/scan/cut.jpg", "Incomplete JPEG ending").with_size(2150),
            Verdict::fail("/scan/slow.png", "Processing error: timed out after 10 ms"),
        ];
        let summary = summarize(&verdicts, 2, Duration::from_secs(1)).with_root("/scan");
        let mut rendered = Vec::new();
        render_text(&mut rendered, &summary, None).unwrap();

        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("=\nDirectory: /scan\nTotal images: 2\n"));
        assert!(text.contains("1. /scan/cut.jpg\n   Size: 2.1 KB\n   Error: Incomplete JPEG ending\n"));
        assert!(text.contains("2. /scan/slow.png\n   Error: Processing error"));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(6), "6 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_clean_report_has_confirmation_line() {
        let summary = summarize(&[Verdict::pass("/ok.png")], 1, Duration::from_secs(1));
        let mut rendered = Vec::new();
        render_text(&mut rendered, &summary, None).unwrap();

        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("No corrupt images found."));
        assert!(!text.contains("CORRUPT IMAGES:"));
        assert!(!text.contains("Date: "));
    }

    #[test]
    fn test_incomplete_scan_is_flagged() {
        let summary = summarize(&[Verdict::pass("/ok.png")], 5, Duration::from_secs(1));
        let mut rendered = Vec::new();
        render_text(&mut rendered, &summary, None).unwrap();
        assert!(String::from_utf8(rendered).unwrap().contains("Status: INCOMPLETE (1 of 5 images checked)"));
    }

    #[test]
    fn test_write_json_report() {
        let temp_file = NamedTempFile::new().unwrap();
        let summary = summarize(&sample_verdicts(), 3, Duration::from_secs(1));

        write_json_report(temp_file.path(), &summary).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["corrupt_count"], 2);
        assert_eq!(json["complete"], true);
        assert_eq!(json["corrupt"][1]["error"], "Incomplete JPEG ending");
        assert!(json["directory"].is_null());
    }
}
