//! # Runner
//!
//! The execution supervisor. A [`Runner`] takes a graph, materializes it if
//! needed, starts one task per node and waits for all of them.
//!
//! ## Failure handling
//!
//! - The first error a node returns is kept; later ones are dropped.
//! - Recording it cancels the run's token, so every other node unwinds at its
//!   next channel operation.
//! - The runner always waits for every node task. Nothing is leaked, and
//!   output already produced upstream of a failure stays produced.
//!
//! ## Outcome
//!
//! - `Ok(())` when every node finished without error and nobody cancelled.
//! - The first recorded node error otherwise. A node that merely observed the
//!   cancellation reports [`PipeError::Cancelled`], which is also what an
//!   externally cancelled run returns.

use crate::error::{NodeError, PipeError, panic_reason};
use crate::graph::Graph;
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

/// Starts every node of a graph concurrently and reports one outcome.
pub struct Runner {
  graph: Graph,
}

impl Runner {
  /// Creates a runner for the given graph.
  pub fn new(graph: Graph) -> Self {
    Self { graph }
  }

  /// Returns the graph this runner drives.
  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// Runs the graph to completion.
  ///
  /// `cancel` is the caller's scope. The run derives a child token from it,
  /// so cancelling the caller stops every node while a node failure never
  /// cancels the caller.
  ///
  /// # Errors
  ///
  /// - Materialization errors, before any node starts.
  /// - The first node failure, or [`PipeError::Cancelled`].
  pub async fn run(mut self, cancel: CancellationToken) -> Result<(), PipeError> {
    if !self.graph.is_materialized() {
      self.graph.materialize()?;
    }

    let token = cancel.child_token();
    let first_error = Arc::new(FirstError::default());
    let graph_name = self.graph.name().to_string();
    info!(graph = %graph_name, nodes = self.graph.nodes().len(), "pipeline started");

    let tasks: Vec<_> = self
      .graph
      .nodes()
      .iter()
      .map(|node| {
        let node = Arc::clone(node);
        let token = token.clone();
        let first_error = Arc::clone(&first_error);
        let span = info_span!("node", node = %node.name());
        tokio::spawn(
          async move {
            debug!("node started");
            let outcome = AssertUnwindSafe(node.start(token.clone())).catch_unwind().await;
            // Backstop for nodes that return without closing what they produce.
            node.close_outputs();

            let err = match outcome {
              Ok(Ok(())) => {
                debug!("node finished");
                return;
              }
              Ok(Err(NodeError::Cancelled)) => {
                debug!("node cancelled");
                PipeError::Cancelled
              }
              Ok(Err(err)) => {
                error!(error = %err, "node failed");
                PipeError::from_node(node.name(), err)
              }
              Err(payload) => {
                let reason = payload
                  .downcast_ref::<&'static str>()
                  .map(|s| (*s).to_string())
                  .or_else(|| payload.downcast_ref::<String>().cloned())
                  .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(reason = %reason, "node panicked");
                PipeError::NodePanicked {
                  node: node.name().to_string(),
                  reason,
                }
              }
            };
            if !first_error.record(err) {
              debug!("later node error discarded");
            }
            token.cancel();
          }
          .instrument(span),
        )
      })
      .collect();

    for (joined, node) in join_all(tasks).await.into_iter().zip(self.graph.nodes()) {
      if let Err(join_err) = joined {
        // The node task itself was torn down, e.g. by runtime shutdown.
        node.close_outputs();
        first_error.record(PipeError::NodePanicked {
          node: node.name().to_string(),
          reason: panic_reason(join_err),
        });
        token.cancel();
      }
    }

    let outcome = match first_error.take() {
      Some(err) => Err(err),
      None if cancel.is_cancelled() => Err(PipeError::Cancelled),
      None => Ok(()),
    };
    match &outcome {
      Ok(()) => info!(graph = %graph_name, "pipeline finished"),
      Err(err) => info!(graph = %graph_name, error = %err, "pipeline stopped"),
    }
    outcome
  }
}

/// Single-slot holder for the first failure of a run.
#[derive(Default)]
struct FirstError {
  slot: Mutex<Option<PipeError>>,
}

impl FirstError {
  /// Stores `err` unless an error is already held. Returns whether it was kept.
  fn record(&self, err: PipeError) -> bool {
    let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
      return false;
    }
    *slot = Some(err);
    true
  }

  fn take(&self) -> Option<PipeError> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
  }
}
