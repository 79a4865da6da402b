//! Single-holder gate around transfer submission

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Binary lock with a non-blocking and a blocking acquire.
///
/// Holding the gate is represented by a [`GateGuard`]; dropping the guard
/// releases it, so every exit path of a holder frees the gate.
#[derive(Debug, Default)]
pub struct ExecutionGate {
    locked: AtomicBool,
    released: Notify,
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate if it is free, without waiting.
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| GateGuard { gate: self })
    }

    /// Wait until the gate is free and take it.
    pub async fn acquire(&self) -> GateGuard<'_> {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            // Register before the retry so a release in between is not missed.
            notified.as_mut().enable();

            if let Some(guard) = self.try_acquire() {
                return guard;
            }
            notified.await;
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn release(&self) {
        let was_locked = self.locked.swap(false, Ordering::Release);
        assert!(was_locked, "execution gate released while not held");
        self.released.notify_waiters();
    }
}

/// Proof of holding the [`ExecutionGate`].
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard<'a> {
    gate: &'a ExecutionGate,
}

impl GateGuard<'_> {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
