//! Scan orchestration
//!
//! Collects candidates, splits them into fixed-size batches and dispatches
//! each batch to the worker pool, waiting for every verdict of a batch
//! before the next one starts. The batch size is the only backpressure:
//! no more than `batch_size` verdicts are ever outstanding.

use anyhow::{Context, Result};
use crossbeam_channel::Select;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::file_scanner::collect_image_files;
use super::progress::Progress;
use crate::config::ScanConfig;
use crate::core::{FileCheck, ImageValidator, PendingVerdict, Verdict, WorkerPool};

/// Lifecycle of a scan. Phases are entered strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Collecting,
    /// 1-based batch index out of `batches`
    Scanning { batch: usize, batches: usize },
    Finalizing,
    Done,
}

/// Mutable aggregate state of one run, owned by the coordinator.
#[derive(Debug)]
pub struct ScanSession {
    started: Instant,
    total: usize,
    verdicts: Vec<Verdict>,
}

impl ScanSession {
    pub fn start(started: Instant, total: usize) -> Self {
        Self {
            started,
            total,
            verdicts: Vec::with_capacity(total),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.verdicts.len()
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Append a verdict. The processed count never exceeds the total.
    pub fn record(&mut self, verdict: Verdict) -> Result<()> {
        anyhow::ensure!(
            self.verdicts.len() < self.total,
            "Received more verdicts than the {} candidates collected",
            self.total
        );
        self.verdicts.push(verdict);
        Ok(())
    }

    /// Freeze the session into its outcome for the scan of `root`.
    pub fn finalize(self, root: PathBuf) -> ScanOutcome {
        ScanOutcome {
            root,
            verdicts: self.verdicts,
            total: self.total,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Frozen result of a scan, handed to the report writer.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Scanned directory, canonicalized when possible
    pub root: PathBuf,
    /// One verdict per processed candidate, in arrival order
    pub verdicts: Vec<Verdict>,
    /// Number of candidates collected
    pub total: usize,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Every candidate produced a verdict.
    pub fn is_complete(&self) -> bool {
        self.verdicts.len() == self.total
    }
}

/// Runs a whole scan: collection, batched dispatch, aggregation.
pub struct ScanCoordinator {
    config: ScanConfig,
    checker: Arc<dyn FileCheck>,
    cancel: Arc<AtomicBool>,
    phase: ScanPhase,
    #[cfg(test)]
    history: Vec<ScanPhase>,
}

impl ScanCoordinator {
    /// Coordinator validating files with [`ImageValidator`].
    pub fn new(config: ScanConfig) -> Self {
        let checker = Arc::new(ImageValidator::new(config.limits));
        Self::with_checker(config, checker)
    }

    pub fn with_checker(config: ScanConfig, checker: Arc<dyn FileCheck>) -> Self {
        Self {
            config,
            checker,
            cancel: Arc::new(AtomicBool::new(false)),
            phase: ScanPhase::Idle,
            #[cfg(test)]
            history: Vec::new(),
        }
    }

    /// Stop dispatching new batches once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    fn enter(&mut self, phase: ScanPhase) {
        debug!(from = ?self.phase, to = ?phase, "Scan phase");
        self.phase = phase;
        #[cfg(test)]
        self.history.push(phase);
    }

    /// Scan `directory` and return one verdict per image candidate.
    ///
    /// The outcome is incomplete only when the cancel flag stopped the scan.
    pub fn scan(&mut self, directory: &Path) -> Result<ScanOutcome> {
        self.config.validate()?;
        if !directory.is_dir() {
            anyhow::bail!("Directory does not exist: {}", directory.display());
        }

        let started = Instant::now();
        self.enter(ScanPhase::Collecting);
        let root = directory
            .canonicalize()
            .unwrap_or_else(|_| directory.to_path_buf());
        info!("Scanning directory: {}", root.display());

        let candidates = collect_image_files(directory);
        let mut session = ScanSession::start(started, candidates.len());

        if candidates.is_empty() {
            info!("No image files found");
            self.enter(ScanPhase::Done);
            return Ok(session.finalize(root));
        }

        info!(
            "Found {} images. Starting analysis with {} workers",
            candidates.len(),
            self.config.workers
        );

        let mut pool = WorkerPool::initialize(
            self.config.workers,
            Arc::clone(&self.checker),
            self.config.file_timeout,
        )
        .context("Failed to initialize worker pool")?;

        let progress = Progress::new(candidates.len(), self.config.verbose);
        let scanned = self.run_batches(&pool, &candidates, &mut session, &progress);

        self.enter(ScanPhase::Finalizing);
        pool.shutdown();

        if let Err(e) = scanned {
            progress.abandon();
            self.enter(ScanPhase::Done);
            return Err(e);
        }

        let outcome = session.finalize(root);
        if outcome.is_complete() {
            progress.finish("Scan complete");
        } else {
            progress.abandon();
            anyhow::ensure!(
                self.cancel.load(Ordering::SeqCst),
                "Scan incomplete: {} of {} files produced a verdict",
                outcome.verdicts.len(),
                outcome.total
            );
        }

        self.enter(ScanPhase::Done);
        Ok(outcome)
    }

    fn run_batches(
        &mut self,
        pool: &WorkerPool,
        candidates: &[PathBuf],
        session: &mut ScanSession,
        progress: &Progress,
    ) -> Result<()> {
        let batch_size = self.config.batch_size;
        let batches = candidates.len().div_ceil(batch_size);

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(
                    "Scan interrupted after {}/{} files",
                    session.processed(),
                    session.total()
                );
                return Ok(());
            }
            if index > 0 && !self.config.batch_pause.is_zero() {
                thread::sleep(self.config.batch_pause);
            }

            self.enter(ScanPhase::Scanning {
                batch: index + 1,
                batches,
            });

            let pending = batch
                .iter()
                .enumerate()
                .map(|(position, path)| pool.dispatch(position, path.clone()))
                .collect::<Result<Vec<_>, _>>()?;

            await_batch(pending, |verdict| {
                session.record(verdict)?;
                if let Some(latest) = session.verdicts().last() {
                    progress.record(session.processed(), latest);
                }
                Ok(())
            })?;
        }

        Ok(())
    }
}

/// Wait for every pending verdict, handling each as soon as it arrives.
fn await_batch(
    mut pending: Vec<PendingVerdict>,
    mut on_verdict: impl FnMut(Verdict) -> Result<()>,
) -> Result<()> {
    while !pending.is_empty() {
        let (index, received) = {
            let mut select = Select::new();
            for entry in &pending {
                select.recv(entry.receiver());
            }
            let operation = select.select();
            let index = operation.index();
            (index, operation.recv(pending[index].receiver()))
        };

        let verdict = pending.swap_remove(index).resolve(received)?;
        on_verdict(verdict)?;
    }
    Ok(())
}
