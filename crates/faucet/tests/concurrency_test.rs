//! Single-flight guarantees under concurrent claims and draining

use async_trait::async_trait;
use futures::future::join_all;
use seq_faucet::{
    ClaimOutcome, ClaimRequest, DrainLoop, FaucetConfig, FaucetError, FaucetResult, FaucetService,
    TransferExecutor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Fails the test run if two transfers ever overlap.
#[derive(Default)]
struct SequencedExecutor {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    nonce: Mutex<u64>,
    funded: Mutex<Vec<String>>,
}

#[async_trait]
impl TransferExecutor for SequencedExecutor {
    fn sender(&self) -> String {
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".to_string()
    }

    async fn transfer(&self, to: &str, _amount: u128) -> FaucetResult<String> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let nonce = *self.nonce.lock().unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        {
            let mut guard = self.nonce.lock().unwrap();
            assert_eq!(*guard, nonce, "nonce advanced by an overlapping transfer");
            *guard += 1;
        }
        self.funded.lock().unwrap().push(to.to_string());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("0x{:064x}", nonce))
    }
}

fn address(i: usize) -> String {
    format!("0x{:040x}", i + 1)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_at_most_one_transfer_in_flight() {
    let executor = Arc::new(SequencedExecutor::default());
    let config = FaucetConfig {
        queue_cap: 16,
        ..Default::default()
    };
    let service = Arc::new(FaucetService::new(config, executor.clone()).unwrap());

    let shutdown = Arc::new(Notify::new());
    let drain = Arc::new(DrainLoop::with_period(
        service.coordinator().clone(),
        Duration::from_millis(5),
    ));
    let drain_handle = drain.spawn(shutdown.clone());

    let claims = (0..40).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .claim(ClaimRequest::new(format!("10.0.0.{}", i), address(i)))
                .await
        })
    });
    let results: Vec<FaucetResult<ClaimOutcome>> = join_all(claims)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(FaucetError::QueueFull)))
        .count();
    assert_eq!(accepted + rejected, 40);

    tokio::time::timeout(Duration::from_secs(5), async {
        while executor.funded.lock().unwrap().len() < accepted {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every accepted claim should be funded");

    shutdown.notify_one();
    drain_handle.await.unwrap();

    assert_eq!(executor.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(executor.funded.lock().unwrap().len(), accepted);
    assert!(service.coordinator().queue().is_empty());
    assert!(!service.coordinator().gate().is_locked());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_never_exceeds_capacity() {
    let executor = Arc::new(SequencedExecutor::default());
    let config = FaucetConfig {
        queue_cap: 3,
        ..Default::default()
    };
    let service = Arc::new(FaucetService::new(config, executor).unwrap());
    let _held = service.coordinator().gate().try_acquire().unwrap();

    let claims = (0..20).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            let result = service
                .claim(ClaimRequest::new(format!("10.1.0.{}", i), address(i)))
                .await;
            assert!(service.coordinator().queue().len() <= 3);
            result
        })
    });
    let results = join_all(claims).await;

    let queued = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|r| matches!(r, Ok(ClaimOutcome::Queued { .. })))
        .count();
    assert_eq!(queued, 3);
    assert_eq!(service.coordinator().queue().len(), 3);
}
