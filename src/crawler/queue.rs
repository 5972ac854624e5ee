//! Time-ordered queue of discovered articles

use crate::models::DiscoveredItem;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe queue of discovered-but-unprocessed items
///
/// Items come out most recently published first. Every operation, reads
/// included, takes the same exclusive lock, so inserts and removals are
/// linearizable. Capacity is unbounded.
#[derive(Debug, Default)]
pub struct PendingQueue {
    /// Kept sorted by `published_at` ascending; the head is the last element
    items: Mutex<Vec<DiscoveredItem>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item, keeping the queue ordered by publication time
    ///
    /// An item published at the same instant as queued ones is placed ahead
    /// of them.
    pub fn insert(&self, item: DiscoveredItem) {
        let mut items = self.lock();
        let position = items.partition_point(|queued| queued.published_at <= item.published_at);
        items.insert(position, item);
    }

    /// Removes and returns the most recently published item
    pub fn remove_next(&self) -> Option<DiscoveredItem> {
        self.lock().pop()
    }

    /// Returns the most recently published item without removing it
    pub fn peek(&self) -> Option<DiscoveredItem> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copies the queue contents, head first
    pub fn snapshot(&self) -> Vec<DiscoveredItem> {
        self.lock().iter().rev().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DiscoveredItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
