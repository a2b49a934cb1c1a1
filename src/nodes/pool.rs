//! # Worker Pools
//!
//! Fixed-size pools of tasks created once per node run. Nodes use them to
//! fan items out to several workers that all drain the same [`Inlet`] and, for
//! transforms, fan results back into one [`Outlet`].
//!
//! A pool runs under a child of the node's token. The first worker failure
//! cancels that child token so its siblings unwind, the pool still waits for
//! every worker, and then it returns the failure. Cancelling the node's token
//! stops the whole pool.

use crate::channel::{Inlet, Outlet};
use crate::error::{NodeError, panic_reason};
use crate::message::Message;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Runs `workers` concurrent tasks and waits for all of them.
///
/// `work` receives the worker's 1-based index and the pool token. A pool size
/// of zero is treated as one.
///
/// # Errors
///
/// The first error returned by a worker (a genuine failure is preferred over
/// the cancellations it causes in its siblings), or
/// [`NodeError::WorkerPanicked`].
pub async fn run_workers<F, Fut>(workers: usize, cancel: &CancellationToken, work: F) -> Result<(), NodeError>
where
  F: Fn(usize, CancellationToken) -> Fut,
  Fut: Future<Output = Result<(), NodeError>> + Send + 'static,
{
  let workers = workers.max(1);
  let pool_token = cancel.child_token();
  let mut running: FuturesUnordered<_> = (1..=workers)
    .map(|worker| tokio::spawn(work(worker, pool_token.clone())))
    .collect();
  trace!(workers, "worker pool started");

  let mut failure: Option<NodeError> = None;
  while let Some(joined) = running.next().await {
    let outcome = joined.unwrap_or_else(|e| Err(NodeError::WorkerPanicked(panic_reason(e))));
    let Err(err) = outcome else {
      continue;
    };
    pool_token.cancel();
    failure = match failure {
      None => Some(err),
      Some(NodeError::Cancelled) if !err.is_cancelled() => Some(err),
      kept => kept,
    };
  }
  trace!(workers, "worker pool drained");

  match failure {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

/// Applies `transform` to every item of `inlet` with `workers` concurrent
/// workers and sends each result to `outlet`.
///
/// The transform cannot fail: per-item failures belong in the result it
/// returns. Results are not ordered across workers. Each input item yields
/// exactly one result, so K inputs never produce more than K results.
///
/// Returns once the input is exhausted and every worker has finished, or once
/// the token fires.
///
/// # Errors
///
/// [`NodeError::Cancelled`] on cancellation, [`NodeError::Disconnected`] if
/// the downstream consumers went away.
pub async fn map_pool<F, Fut>(
  workers: usize,
  inlet: Inlet,
  outlet: Outlet,
  cancel: &CancellationToken,
  transform: F,
) -> Result<(), NodeError>
where
  F: Fn(Message) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Message> + Send + 'static,
{
  let transform = Arc::new(transform);
  run_workers(workers, cancel, move |worker, token| {
    let inlet = inlet.clone();
    let outlet = outlet.clone();
    let transform = Arc::clone(&transform);
    async move {
      while let Some(item) = inlet.recv(&token).await? {
        let result = transform(item).await;
        outlet.send(result, &token).await?;
      }
      trace!(worker, "input exhausted");
      Ok(())
    }
  })
  .await
}
