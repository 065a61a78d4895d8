//! Scan configuration

use anyhow::Result;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Paths per dispatch batch; also the cap on verdicts in flight.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Pause between batches.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(50);

/// Per-file watchdog timeout.
pub const DEFAULT_FILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Thresholds applied by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    /// Smallest plausible image file in bytes
    pub min_file_size: u64,
    /// Largest accepted width or height in pixels
    pub max_dimension: u32,
    /// Longest edge of the resample probe
    pub probe_size: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_file_size: 100,
            max_dimension: 50_000,
            probe_size: 100,
        }
    }
}

/// Settings for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of persistent validator workers
    pub workers: usize,
    /// Paths dispatched together before waiting for their verdicts
    pub batch_size: usize,
    /// Throttle inserted between batches
    pub batch_pause: Duration,
    /// Log every verdict instead of every 100th
    pub verbose: bool,
    /// Watchdog timeout per file; `None` runs checks inline without a watchdog
    pub file_timeout: Option<Duration>,
    pub limits: ValidationLimits,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
            verbose: true,
            file_timeout: Some(DEFAULT_FILE_TIMEOUT),
            limits: ValidationLimits::default(),
        }
    }
}

impl ScanConfig {
    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("Worker count must be at least 1");
        }
        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be at least 1");
        }
        if self.limits.probe_size == 0 {
            anyhow::bail!("Probe size must be at least 1 pixel");
        }
        Ok(())
    }
}

/// Logical CPU count, falling back to a single worker.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
