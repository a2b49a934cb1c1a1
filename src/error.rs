//! # Error Handling
//!
//! Typed errors for every layer of a pipeline:
//!
//! - **NodeError**: the outcome of a single node's run. Returned by
//!   [`Node::start`](crate::node::Node::start).
//! - **PipeError**: graph construction failures and the single outcome the
//!   [`Runner`](crate::runner::Runner) reports for a whole run.
//!
//! Per-item failures are never errors at this level. They travel downstream as
//! data inside [`ChecksumResult`](crate::message::ChecksumResult) and friends.
//!
//! Loader and registry errors live next to the loader in
//! [`loader::LoadError`](crate::loader::LoadError).

use std::io;
use thiserror::Error;

/// Outcome of a node run that did not complete successfully.
#[derive(Debug, Error)]
pub enum NodeError {
  /// The cancellation signal fired while the node was running.
  #[error("cancelled")]
  Cancelled,

  /// An unrecoverable I/O failure, such as an unopenable sink destination or
  /// an unreadable directory during traversal.
  #[error("{context}: {source}")]
  Io {
    /// What the node was doing when the failure happened.
    context: String,
    /// The underlying I/O error.
    #[source]
    source: io::Error,
  },

  /// Every consumer of an output port went away while the node still had
  /// items to deliver.
  #[error("output port '{port}' has no remaining receivers")]
  Disconnected {
    /// The output port that could not be written.
    port: String,
  },

  /// The node was asked to do something it cannot do.
  #[error("{0}")]
  Invalid(String),

  /// A task inside the node's worker pool panicked.
  #[error("worker panicked: {0}")]
  WorkerPanicked(String),
}

impl NodeError {
  /// Wraps an I/O error with a short description of the failed operation.
  pub fn io(context: impl Into<String>, source: io::Error) -> Self {
    NodeError::Io {
      context: context.into(),
      source,
    }
  }

  /// Returns `true` if this is the cancellation outcome.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    matches!(self, NodeError::Cancelled)
  }
}

/// Errors raised while building a graph or reported by a run.
#[derive(Debug, Error)]
pub enum PipeError {
  /// An edge references a node that is not part of the graph, or names an
  /// empty port.
  #[error("invalid edge {from}.{out_port} -> {to}.{in_port}: {reason}")]
  InvalidEdge {
    /// Producing node id.
    from: String,
    /// Output port name.
    out_port: String,
    /// Consuming node id.
    to: String,
    /// Input port name.
    in_port: String,
    /// Why the edge was rejected.
    reason: String,
  },

  /// Two nodes share one id.
  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  /// The graph was already wired into channels and can no longer change.
  #[error("graph '{0}' is already materialized")]
  AlreadyMaterialized(String),

  /// An output port is connected more than once while the graph rejects
  /// shared-channel fan-out.
  #[error(
    "output port {node}.{port} is connected to more than one input; insert a tee node to duplicate items"
  )]
  SharedOutput {
    /// Producing node id.
    node: String,
    /// Output port name.
    port: String,
  },

  /// The run was cancelled, either by the caller or by a node observing the
  /// shared signal before any other failure was recorded.
  #[error("pipeline cancelled")]
  Cancelled,

  /// A node's run failed.
  #[error("node '{node}' failed: {source}")]
  NodeFailed {
    /// Id of the failing node.
    node: String,
    /// The node's own error.
    #[source]
    source: NodeError,
  },

  /// A node's task panicked instead of returning.
  #[error("node '{node}' panicked: {reason}")]
  NodePanicked {
    /// Id of the panicking node.
    node: String,
    /// Panic payload, when it was a string.
    reason: String,
  },
}

impl PipeError {
  /// Attributes a node outcome to the node that produced it.
  ///
  /// Cancellation keeps its identity so callers can tell an aborted run from
  /// a failed one.
  pub fn from_node(node: &str, err: NodeError) -> Self {
    match err {
      NodeError::Cancelled => PipeError::Cancelled,
      source => PipeError::NodeFailed {
        node: node.to_string(),
        source,
      },
    }
  }

  /// Returns `true` if this is the cancellation outcome.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    matches!(self, PipeError::Cancelled)
  }
}

/// Extracts a readable reason from a task panic payload.
pub(crate) fn panic_reason(err: tokio::task::JoinError) -> String {
  if err.is_cancelled() {
    return "task aborted".to_string();
  }
  match err.try_into_panic() {
    Ok(payload) => {
      if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
      } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
      } else {
        "non-string panic payload".to_string()
      }
    }
    Err(_) => "task failed".to_string(),
  }
}
