//! Candidate collection and scan orchestration

pub mod coordinator;
pub mod file_scanner;
pub mod progress;

pub use coordinator::{ScanCoordinator, ScanOutcome, ScanPhase, ScanSession};
pub use file_scanner::{collect_image_files, is_image_file, IMAGE_EXTENSIONS};
pub use progress::Progress;
