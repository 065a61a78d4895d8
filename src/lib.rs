//! Image Validator Library
//!
//! A parallel image-integrity scanner: collects image files below a
//! directory and validates each one on a fixed pool of worker threads,
//! in bounded batches.

pub mod config;
pub mod core;
pub mod logging;
pub mod reporting;
pub mod scanner;

pub use crate::core::validator;
pub use crate::reporting::report_writer;
pub use crate::scanner::file_scanner;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ScanConfig, ValidationLimits};
    pub use crate::core::validator::{
        check_content, check_extent, check_header, check_probe_data, HeaderFormat, ImageValidator,
        ValidationError,
    };
    pub use crate::core::verdict::Verdict;
    pub use crate::core::worker_pool::{FileCheck, PendingVerdict, PoolError, WorkerPool};
    pub use crate::reporting::report_writer::{
        format_file_size, print_summary, summarize, write_json_report, write_report, ScanSummary,
    };
    pub use crate::scanner::coordinator::{ScanCoordinator, ScanOutcome, ScanPhase};
    pub use crate::scanner::file_scanner::{collect_image_files, is_image_file};
}
