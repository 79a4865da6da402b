//! Background loop that empties the claim queue

use crate::coordinator::ClaimCoordinator;
use crate::metrics::path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Tick period of the drain loop.
pub const DRAIN_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    Draining,
}

/// Transfers attempted during one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct DrainLoop {
    coordinator: Arc<ClaimCoordinator>,
    period: Duration,
    draining: AtomicBool,
}

impl DrainLoop {
    pub fn new(coordinator: Arc<ClaimCoordinator>) -> Self {
        Self::with_period(coordinator, DRAIN_PERIOD)
    }

    pub fn with_period(coordinator: Arc<ClaimCoordinator>, period: Duration) -> Self {
        Self {
            coordinator,
            period,
            draining: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> DrainState {
        if self.draining.load(Ordering::Acquire) {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    /// One tick: if anything is queued, take the gate and fund every queued
    /// address in order. Failed transfers are logged and dropped.
    ///
    /// An empty queue returns immediately without touching the gate.
    pub async fn tick(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let queue = self.coordinator.queue();
        if queue.is_empty() {
            return report;
        }

        let guard = self.coordinator.gate().acquire().await;
        self.draining.store(true, Ordering::Release);
        debug!(pending = queue.len(), "Draining claim queue");

        let executor = self.coordinator.executor();
        let metrics = self.coordinator.metrics();
        while let Some(address) = queue.dequeue() {
            metrics.queue_length.set(queue.len() as i64);

            let started = Instant::now();
            let result = executor.transfer(&address, self.coordinator.payout()).await;
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(tx_hash) => {
                    report.succeeded += 1;
                    metrics.record_transfer(path::QUEUE, true, elapsed);
                    info!(address = %address, tx_hash = %tx_hash, "Consume from queue successfully");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics.record_transfer(path::QUEUE, false, elapsed);
                    error!(address = %address, error = %e, "Failed to handle transaction in the queue");
                }
            }
        }

        self.draining.store(false, Ordering::Release);
        guard.release();
        report
    }

    /// Tick every period until `shutdown` is notified. A pass that is
    /// already running completes before the loop exits.
    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = self.period.as_millis() as u64, "Drain loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if report.total() > 0 {
                        info!(succeeded = report.succeeded, failed = report.failed, "Drained claim queue");
                    }
                }
                _ = shutdown.notified() => {
                    info!("Drain loop stopped");
                    break;
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>, shutdown: Arc<Notify>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests::MockExecutor;
    use crate::metrics::FaucetMetrics;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn setup(executor: Arc<MockExecutor>, capacity: usize) -> (Arc<ClaimCoordinator>, Arc<DrainLoop>) {
        let coordinator = Arc::new(ClaimCoordinator::new(
            executor,
            capacity,
            1,
            Arc::new(FaucetMetrics::new().unwrap()),
        ));
        let drain = Arc::new(DrainLoop::with_period(coordinator.clone(), Duration::from_millis(10)));
        (coordinator, drain)
    }

    #[tokio::test]
    async fn test_tick_drains_in_order_and_drops_failures() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .finish();
        let _log_guard = tracing::subscriber::set_default(subscriber);

        let executor = Arc::new(MockExecutor::default());
        executor.fail_for("A");
        let (coordinator, drain) = setup(executor.clone(), 2);
        assert!(coordinator.queue().try_enqueue("A".into()));
        assert!(coordinator.queue().try_enqueue("B".into()));

        let report = drain.tick().await;

        assert_eq!(report, DrainReport { succeeded: 1, failed: 1 });
        assert_eq!(executor.calls(), vec!["A", "B"]);
        assert!(coordinator.queue().is_empty());
        assert!(!coordinator.gate().is_locked());
        assert_eq!(drain.state(), DrainState::Idle);

        let lines = logs.lines();
        let funded: Vec<_> = lines
            .iter()
            .filter(|l| l.contains("Consume from queue successfully"))
            .collect();
        assert_eq!(funded.len(), 1);
        assert!(funded[0].contains("address=B"));
        assert!(funded[0].contains("tx_hash=0xhash-B"));

        let failed: Vec<_> = lines
            .iter()
            .filter(|l| l.contains("Failed to handle transaction in the queue"))
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].contains("address=A"));
    }

    #[tokio::test]
    async fn test_idle_tick_does_not_touch_gate() {
        let executor = Arc::new(MockExecutor::default());
        let (coordinator, drain) = setup(executor.clone(), 2);
        let _held = coordinator.gate().try_acquire().unwrap();

        // Would block forever if it tried to acquire the held gate.
        let report = tokio::time::timeout(Duration::from_secs(1), drain.tick())
            .await
            .expect("idle tick must not wait for the gate");
        assert_eq!(report.total(), 0);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tick_waits_for_direct_transfer() {
        let executor = Arc::new(MockExecutor::default());
        let (coordinator, drain) = setup(executor.clone(), 2);
        let held = coordinator.gate().try_acquire().unwrap();
        assert!(coordinator.queue().try_enqueue("A".into()));

        let pending = tokio::spawn({
            let drain = drain.clone();
            async move { drain.tick().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(executor.calls().is_empty());

        held.release();
        let report = pending.await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(executor.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_drains_then_stops_on_shutdown() {
        let executor = Arc::new(MockExecutor::default());
        let (coordinator, drain) = setup(executor.clone(), 4);
        let shutdown = Arc::new(Notify::new());
        let handle = drain.clone().spawn(shutdown.clone());

        assert!(coordinator.queue().try_enqueue("A".into()));
        assert!(coordinator.queue().try_enqueue("B".into()));

        tokio::time::timeout(Duration::from_secs(2), async {
            while executor.calls().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queued claims should be drained");

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("drain loop should stop")
            .unwrap();
        assert!(coordinator.queue().is_empty());
    }
}
