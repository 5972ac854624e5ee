//! Bounded-concurrency task pool with cooperative cancellation
//!
//! The pool moves through three states:
//!
//! | State | Entered by | Admits tasks | Runs tasks |
//! |-------|------------|--------------|------------|
//! | Idle | `TaskPool::new` | yes (held until start) | no |
//! | Admitting | `start` | yes (run immediately) | yes |
//! | Dying | `kill` or a bound cancellation | no | already-running tasks finish |
//!
//! The concurrency limit is enforced by callers: `await_admission` blocks
//! until a slot is free, `submit` never blocks. A task counts against the
//! limit from the moment it is admitted, not from the moment it starts.

use crate::sync::{ErrorCollector, InFlightCounter, PoolError};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Kill reason recorded when a bound cancellation token fires
pub const EXTERNAL_CANCELLATION: &str = "external cancellation";

/// Bounded-concurrency task admission and lifecycle controller
///
/// Cloning a `TaskPool` yields another handle to the same pool.
pub struct TaskPool<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    counter: InFlightCounter,
    errors: ErrorCollector<E>,
    started: watch::Sender<bool>,
    dying: CancellationToken,
    kill_reason: Mutex<Option<String>>,
    /// Zero means unlimited
    limit: AtomicUsize,
}

impl<E: Send + 'static> TaskPool<E> {
    /// Creates an idle pool with no concurrency limit
    pub fn new() -> Self {
        let (started, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                counter: InFlightCounter::new(),
                errors: ErrorCollector::new(),
                started,
                dying: CancellationToken::new(),
                kill_reason: Mutex::new(None),
                limit: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates an idle pool limited to `limit` concurrent tasks
    pub fn with_limit(limit: usize) -> Self {
        let pool = Self::new();
        pool.set_limit(limit);
        pool
    }

    /// Attaches an external cancellation source
    ///
    /// When `signal` is cancelled the pool is killed with reason
    /// [`EXTERNAL_CANCELLATION`]. Must be called from within a Tokio runtime.
    ///
    /// The watcher only holds a weak handle, so it does not keep the pool
    /// alive. It exits when either `signal` fires or the pool starts dying.
    pub fn bind(&self, signal: CancellationToken) {
        let inner = Arc::downgrade(&self.inner);
        let dying = self.inner.dying.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = signal.cancelled() => {
                    let Some(inner) = inner.upgrade() else {
                        return;
                    };
                    if inner.kill(EXTERNAL_CANCELLATION).is_ok() {
                        tracing::info!("Task pool killed by external cancellation");
                    }
                }
                () = dying.cancelled() => {}
            }
        });
    }

    /// Sets the maximum number of concurrently admitted tasks (0 = unlimited)
    pub fn set_limit(&self, limit: usize) {
        self.inner.limit.store(limit, Ordering::SeqCst);
    }

    /// Returns the configured limit (0 = unlimited)
    pub fn limit(&self) -> usize {
        self.inner.limit.load(Ordering::SeqCst)
    }

    /// Admits a task
    ///
    /// The in-flight count is incremented immediately. Before `start` the
    /// task waits for the start signal; afterwards it runs right away. If the
    /// pool dies before it is started, the task is dropped without running.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The task was admitted
    /// * `Err(PoolError::Dying)` - The pool has been killed
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        if self.is_dying() {
            return Err(PoolError::Dying);
        }

        self.inner.counter.increment(1);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_task(task).await;
        });

        Ok(())
    }

    /// Waits until a concurrency slot is free
    ///
    /// Returns immediately when the pool is unlimited or dying, and wakes
    /// early if the pool dies while waiting.
    pub async fn await_admission(&self) {
        if self.is_dying() {
            return;
        }

        let limit = self.limit();
        if limit == 0 {
            return;
        }

        tokio::select! {
            () = self.inner.counter.wait_below(limit) => {}
            () = self.inner.dying.cancelled() => {}
        }
    }

    /// Releases every admitted task and lets future submissions run immediately
    pub fn start(&self) -> Result<(), PoolError> {
        if self.is_dying() {
            return Err(PoolError::Dying);
        }

        if self.inner.started.send_replace(true) {
            return Err(PoolError::AlreadyStarted);
        }

        Ok(())
    }

    /// Marks the pool as dying and signals running tasks to stop
    ///
    /// Running tasks are not interrupted; they observe the signal through
    /// [`TaskPool::cancellation_signal`] and exit on their own.
    pub fn kill(&self, reason: impl Into<String>) -> Result<(), PoolError> {
        self.inner.kill(reason)
    }

    /// Returns the kill reason, if the pool is dying
    pub fn kill_reason(&self) -> Option<String> {
        self.inner
            .kill_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a token that is cancelled once the pool is dying
    ///
    /// The returned token is a child of the pool's own signal: cancelling it
    /// does not kill the pool.
    pub fn cancellation_signal(&self) -> CancellationToken {
        self.inner.dying.child_token()
    }

    /// Completes once the pool is dying
    pub async fn cancelled(&self) {
        self.inner.dying.cancelled().await;
    }

    pub fn is_dying(&self) -> bool {
        self.inner.dying.is_cancelled()
    }

    pub fn is_started(&self) -> bool {
        *self.inner.started.borrow()
    }

    /// Number of admitted tasks that have not yet completed
    pub fn in_flight(&self) -> usize {
        self.inner.counter.count()
    }

    /// Waits until every admitted task has completed
    pub async fn wait(&self) {
        self.inner.counter.wait_zero().await;
    }

    /// Removes and returns the errors recorded by completed tasks
    ///
    /// This is the only way to read errors when `E` is not `Clone`; see
    /// [`TaskPool::errors`] for a non-draining read.
    pub fn take_errors(&self) -> Vec<E> {
        self.inner.errors.drain()
    }

    /// Number of errors recorded and not yet taken
    pub fn error_count(&self) -> usize {
        self.inner.errors.len()
    }
}

impl<E: Clone + Send + 'static> TaskPool<E> {
    /// Returns every error recorded and not yet taken, oldest first
    pub fn errors(&self) -> Vec<E> {
        self.inner.errors.all()
    }
}

impl<E> Inner<E> {
    fn kill(&self, reason: impl Into<String>) -> Result<(), PoolError> {
        let mut kill_reason = self
            .kill_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.dying.is_cancelled() {
            return Err(PoolError::Dying);
        }

        *kill_reason = Some(reason.into());
        self.dying.cancel();
        Ok(())
    }

    async fn run_task<F>(&self, task: F)
    where
        F: Future<Output = Result<(), E>>,
    {
        // Decrements even if the task panics, so `wait` cannot hang.
        let _completion = Completion(&self.counter);

        let mut started = self.started.subscribe();
        let released = tokio::select! {
            biased;
            released = async { started.wait_for(|started| *started).await.is_ok() } => released,
            () = self.dying.cancelled() => false,
        };

        if !released {
            tracing::debug!("Task dropped before start: pool is dying");
            return;
        }

        if let Err(e) = task.await {
            self.errors.record(e);
        }
    }
}

struct Completion<'a>(&'a InFlightCounter);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.decrement() {
            tracing::error!(error = %e, "Task completion without matching admission");
        }
    }
}

impl<E> Clone for TaskPool<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Send + 'static> Default for TaskPool<E> {
    fn default() -> Self {
        Self::new()
    }
}
