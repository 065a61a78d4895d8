//! Scan report rendering

pub mod report_writer;

pub use report_writer::{
    format_file_size, print_summary, render_text, summarize, write_json_report, write_report, ScanSummary,
};
