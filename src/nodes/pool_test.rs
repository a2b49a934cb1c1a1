//! # Worker Pool Test Suite

use crate::channel::channel;
use crate::error::NodeError;
use crate::message::message;
use crate::nodes::pool::{map_pool, run_workers};
use crate::testing::as_i64;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_every_worker_runs_once() {
  let seen = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&seen);
  run_workers(5, &CancellationToken::new(), move |_, _| {
    let counter = Arc::clone(&counter);
    async move {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  })
  .await
  .unwrap();
  assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_zero_workers_still_runs_one() {
  let seen = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&seen);
  run_workers(0, &CancellationToken::new(), move |worker, _| {
    let counter = Arc::clone(&counter);
    async move {
      assert_eq!(worker, 1);
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  })
  .await
  .unwrap();
  assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_first_failure_cancels_the_pool_but_not_the_caller() {
  let caller = CancellationToken::new();
  let result = timeout(
    Duration::from_secs(5),
    run_workers(4, &caller, |worker, token| async move {
      if worker == 2 {
        return Err(NodeError::Invalid("worker two broke".into()));
      }
      token.cancelled().await;
      Err(NodeError::Cancelled)
    }),
  )
  .await
  .expect("pool must unwind");

  match result {
    Err(NodeError::Invalid(reason)) => assert_eq!(reason, "worker two broke"),
    other => panic!("unexpected {other:?}"),
  }
  assert!(!caller.is_cancelled());
}

#[tokio::test]
async fn test_worker_panic_is_reported() {
  let result = run_workers(2, &CancellationToken::new(), |worker, token| async move {
    if worker == 1 {
      panic!("worker exploded");
    }
    token.cancelled().await;
    Err(NodeError::Cancelled)
  })
  .await;
  match result {
    Err(NodeError::WorkerPanicked(reason)) => assert!(reason.contains("worker exploded")),
    other => panic!("unexpected {other:?}"),
  }
}

#[tokio::test]
async fn test_map_pool_produces_exactly_k_results() {
  let cancel = CancellationToken::new();
  let (in_tx, in_rx) = channel("in", 8);
  let (out_tx, out_rx) = channel("out", 8);

  let feeder = {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      for i in 0..100i64 {
        in_tx.send(message(i), &cancel).await.unwrap();
      }
    })
  };
  let pool = {
    let cancel = cancel.clone();
    tokio::spawn(async move { map_pool(3, in_rx, out_tx, &cancel, |item| async move { message(as_i64(&item) * 2) }).await })
  };

  let mut got = Vec::new();
  while let Some(item) = out_rx.recv(&cancel).await.unwrap() {
    got.push(as_i64(&item));
  }
  feeder.await.unwrap();
  pool.await.unwrap().unwrap();

  got.sort_unstable();
  assert_eq!(got, (0..100).map(|i| i * 2).collect::<Vec<_>>());
}
