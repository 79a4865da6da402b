//! Bounded FIFO of addresses waiting to be funded

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Fixed-capacity claim queue. Every operation is non-blocking apart from
/// the short internal lock.
#[derive(Debug)]
pub struct ClaimQueue {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl ClaimQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an address. Returns `false` and leaves the queue untouched when full.
    pub fn try_enqueue(&self, address: String) -> bool {
        let mut entries = self.entries();
        if entries.len() >= self.capacity {
            return false;
        }
        entries.push_back(address);
        true
    }

    /// Pop the oldest address, if any.
    pub fn dequeue(&self) -> Option<String> {
        self.entries().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
