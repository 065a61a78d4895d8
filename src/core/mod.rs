//! Per-file validation and the worker pool that runs it

pub mod validator;
pub mod verdict;
pub mod worker_pool;

pub use validator::{HeaderFormat, ImageValidator, ValidationError};
pub use verdict::Verdict;
pub use worker_pool::{FileCheck, PendingVerdict, PoolError, WorkerPool};
