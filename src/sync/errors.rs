use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe accumulator for errors produced by background tasks
///
/// Errors are kept in insertion order with no deduplication and no bound.
#[derive(Debug)]
pub struct ErrorCollector<E> {
    errors: Mutex<Vec<E>>,
}

impl<E> ErrorCollector<E> {
    pub fn new() -> Self {
        Self {
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Appends an error
    pub fn record(&self, error: E) {
        self.lock().push(error);
    }

    /// Removes and returns every recorded error, oldest first
    pub fn drain(&self) -> Vec<E> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<E>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone> ErrorCollector<E> {
    /// Returns a copy of every recorded error without clearing them
    pub fn all(&self) -> Vec<E> {
        self.lock().clone()
    }
}

impl<E> Default for ErrorCollector<E> {
    fn default() -> Self {
        Self::new()
    }
}
