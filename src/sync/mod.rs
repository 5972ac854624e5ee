//! Concurrency primitives for running discovery jobs
//!
//! This module provides the building blocks the crawler schedules its work
//! with:
//! - `InFlightCounter`: count of admitted-but-unfinished tasks, awaitable
//! - `ErrorCollector`: thread-safe accumulation of task errors
//! - `TaskPool`: bounded-concurrency task admission with cooperative cancellation

mod counter;
mod errors;
mod pool;

pub use counter::InFlightCounter;
pub use errors::ErrorCollector;
pub use pool::{TaskPool, EXTERNAL_CANCELLATION};

use thiserror::Error;

/// Errors raised by the task pool and its accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool has been killed and no longer admits or starts tasks
    #[error("task pool is already dying")]
    Dying,

    /// A completion was recorded with no matching admission
    #[error("in-flight counter would go negative")]
    NegativeCounter,

    /// `start` was called on a pool that is already running
    #[error("task pool has already been started")]
    AlreadyStarted,
}
