//! In-flight task accounting

use crate::sync::PoolError;
use tokio::sync::watch;

/// Counts tasks that have been admitted but have not yet completed
///
/// The count lives in a `watch` channel so that callers can await a
/// threshold (`wait_below`, `wait_zero`) without polling. Every mutation
/// goes through the channel's exclusive write path.
#[derive(Debug)]
pub struct InFlightCounter {
    count: watch::Sender<usize>,
}

impl InFlightCounter {
    /// Creates a counter starting at zero
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    /// Adds `n` admitted tasks
    pub fn increment(&self, n: usize) {
        if n == 0 {
            return;
        }
        self.count.send_modify(|count| *count += n);
    }

    /// Records the completion of one task
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The count was decremented
    /// * `Err(PoolError::NegativeCounter)` - The count was already zero and is left unchanged
    pub fn decrement(&self) -> Result<(), PoolError> {
        let mut underflow = false;
        self.count.send_if_modified(|count| {
            if *count == 0 {
                underflow = true;
                false
            } else {
                *count -= 1;
                true
            }
        });

        if underflow {
            Err(PoolError::NegativeCounter)
        } else {
            Ok(())
        }
    }

    /// Returns the current number of in-flight tasks
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Waits until the count is strictly below `limit`
    pub async fn wait_below(&self, limit: usize) {
        let mut rx = self.count.subscribe();
        // The sender is owned by `self`, so the channel stays open while we wait.
        let _ = rx.wait_for(|count| *count < limit).await;
    }

    /// Waits until every admitted task has completed
    pub async fn wait_zero(&self) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for InFlightCounter {
    fn default() -> Self {
        Self::new()
    }
}
