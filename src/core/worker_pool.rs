//! Persistent validator workers with message-based dispatch
//!
//! Each worker slot owns a request channel and runs as a long-lived loop on
//! its own thread of a dedicated rayon pool. A dispatch sends a path along
//! with a one-shot reply channel and the worker answers with exactly one
//! verdict. Workers share no mutable state with the caller or each other.
//!
//! A worker that dies never answers: its reply sender is dropped, which the
//! caller observes as [`PoolError::WorkerCrashed`]. Dead workers are not
//! replaced.
//!
//! Shutdown discards queued requests and returns only after every worker
//! loop has exited.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvError, RecvTimeoutError, Sender};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::validator::{panic_message, ValidationError};
use super::verdict::Verdict;

/// Per-file check executed by a worker.
pub trait FileCheck: Send + Sync + 'static {
    fn check_file(&self, path: &Path) -> Verdict;
}

impl<F> FileCheck for F
where
    F: Fn(&Path) -> Verdict + Send + Sync + 'static,
{
    fn check_file(&self, path: &Path) -> Verdict {
        self(path)
    }
}

/// Faults of the pool itself, as opposed to per-file validation failures.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to start worker pool: {0}")]
    Init(String),

    #[error("Worker pool has been shut down")]
    ShutDown,

    #[error("Worker {slot} is no longer running")]
    WorkerGone { slot: usize },

    #[error("Worker {slot} crashed while validating {}", path.display())]
    WorkerCrashed { slot: usize, path: PathBuf },
}

struct Job {
    path: PathBuf,
    reply: Sender<Verdict>,
}

/// Opaque reference to one worker. Owns only the worker's request channel.
struct WorkerHandle {
    requests: Sender<Job>,
}

/// A dispatched path whose verdict has not been received yet.
#[derive(Debug)]
pub struct PendingVerdict {
    slot: usize,
    path: PathBuf,
    reply: Receiver<Verdict>,
}

impl PendingVerdict {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Channel the verdict arrives on, for multiplexing with `Select`.
    pub fn receiver(&self) -> &Receiver<Verdict> {
        &self.reply
    }

    /// Block until the worker replies.
    pub fn wait(self) -> Result<Verdict, PoolError> {
        let received = self.reply.recv();
        self.resolve(received)
    }

    /// Turn a receive outcome from [`receiver`](Self::receiver) into a verdict.
    pub fn resolve(self, received: Result<Verdict, RecvError>) -> Result<Verdict, PoolError> {
        received.map_err(|_| PoolError::WorkerCrashed {
            slot: self.slot,
            path: self.path,
        })
    }
}

/// Fixed-size pool of persistent validator workers.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    threads: Option<rayon::ThreadPool>,
    stopping: Arc<AtomicBool>,
    /// Disconnects once every worker loop has returned or unwound
    exited: Option<Receiver<()>>,
}

impl WorkerPool {
    /// Start `size` workers running `checker`.
    ///
    /// With `file_timeout` set, each worker runs checks on a helper thread
    /// and answers with a `ProcessingError` verdict when a check overruns.
    pub fn initialize(
        size: usize,
        checker: Arc<dyn FileCheck>,
        file_timeout: Option<Duration>,
    ) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::Init("worker count must be at least 1".to_string()));
        }

        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("validator-{}", i))
            .panic_handler(|payload| {
                error!(reason = %panic_message(payload.as_ref()), "Validator worker crashed");
            })
            .build()
            .map_err(|e| PoolError::Init(e.to_string()))?;

        let stopping = Arc::new(AtomicBool::new(false));
        let (exit_latch, exited) = bounded::<()>(0);

        let workers = (0..size)
            .map(|slot| {
                let (requests, inbox) = unbounded::<Job>();
                let checker = Arc::clone(&checker);
                let stopping = Arc::clone(&stopping);
                let exit_latch = exit_latch.clone();
                threads.spawn(move || {
                    let _running = exit_latch;
                    run_worker(slot, inbox, checker, &stopping, file_timeout);
                });
                WorkerHandle { requests }
            })
            .collect();
        drop(exit_latch);

        debug!(workers = size, timeout = ?file_timeout, "Worker pool started");
        Ok(Self {
            workers,
            threads: Some(threads),
            stopping,
            exited: Some(exited),
        })
    }

    /// Number of worker slots.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Round-robin slot for the `position`-th path of a batch.
    pub fn slot_for(&self, position: usize) -> usize {
        position % self.workers.len()
    }

    /// Send `path` to the worker at `slot_for(position)`.
    ///
    /// A busy worker queues the request behind its current one.
    pub fn dispatch(&self, position: usize, path: PathBuf) -> Result<PendingVerdict, PoolError> {
        if self.workers.is_empty() {
            return Err(PoolError::ShutDown);
        }
        let slot = self.slot_for(position);
        let (reply, receiver) = bounded(1);

        self.workers[slot]
            .requests
            .send(Job {
                path: path.clone(),
                reply,
            })
            .map_err(|_| PoolError::WorkerGone { slot })?;

        Ok(PendingVerdict {
            slot,
            path,
            reply: receiver,
        })
    }

    /// Stop all workers and wait for them to exit. Safe to call repeatedly.
    ///
    /// Requests still queued are dropped unchecked, so their pending
    /// verdicts resolve as [`PoolError::WorkerCrashed`]. A check already
    /// running is allowed to finish.
    pub fn shutdown(&mut self) {
        if self.threads.is_none() {
            return;
        }
        self.stopping.store(true, Ordering::SeqCst);
        self.workers.clear();

        if let Some(exited) = self.exited.take() {
            // Nothing is ever sent; this returns once all latch senders are gone
            let _ = exited.recv();
        }
        self.threads = None;
        debug!("Worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    slot: usize,
    inbox: Receiver<Job>,
    checker: Arc<dyn FileCheck>,
    stopping: &AtomicBool,
    file_timeout: Option<Duration>,
) {
    // Buffered jobs outlive the senders, so the flag is what ends the loop
    let jobs = inbox.iter().take_while(|_| !stopping.load(Ordering::SeqCst));

    let Some(limit) = file_timeout else {
        for job in jobs {
            let verdict = checker.check_file(&job.path);
            // Err only when the caller stopped waiting
            let _ = job.reply.send(verdict);
        }
        debug!(slot, "Worker stopped");
        return;
    };

    let mut runner = match TimedRunner::start(slot, Arc::clone(&checker)) {
        Ok(runner) => runner,
        Err(e) => {
            error!(slot, error = %e, "Failed to start validation thread");
            return;
        }
    };

    for job in jobs {
        match runner.run(&job.path, limit) {
            Ok(verdict) => {
                let _ = job.reply.send(verdict);
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(slot, path = %job.path.display(), "Validation timed out");
                let error = ValidationError::ProcessingError(format!(
                    "timed out after {} ms",
                    limit.as_millis()
                ));
                let _ = job.reply.send(Verdict::fail(&job.path, error));

                // The stalled thread is abandoned and exits once its check returns
                runner = match TimedRunner::start(slot, Arc::clone(&checker)) {
                    Ok(runner) => runner,
                    Err(e) => {
                        error!(slot, error = %e, "Failed to restart validation thread");
                        return;
                    }
                };
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!(slot, path = %job.path.display(), "Validation thread died, stopping worker");
                return;
            }
        }
    }
    debug!(slot, "Worker stopped");
}

/// Helper thread a worker hands checks to so it can bound their duration.
struct TimedRunner {
    requests: Sender<PathBuf>,
    verdicts: Receiver<Verdict>,
}

impl TimedRunner {
    fn start(slot: usize, checker: Arc<dyn FileCheck>) -> io::Result<Self> {
        let (requests, inbox) = bounded::<PathBuf>(1);
        let (outbox, verdicts) = bounded::<Verdict>(1);

        thread::Builder::new()
            .name(format!("validator-{}-check", slot))
            .spawn(move || {
                for path in inbox.iter() {
                    if outbox.send(checker.check_file(&path)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { requests, verdicts })
    }

    fn run(&self, path: &Path, limit: Duration) -> Result<Verdict, RecvTimeoutError> {
        self.requests
            .send(path.to_path_buf())
            .map_err(|_| RecvTimeoutError::Disconnected)?;
        self.verdicts.recv_timeout(limit)
    }
}
