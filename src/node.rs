//! # Node Lifecycle Contract
//!
//! This module defines the [`Node`] trait every processing unit implements and
//! [`BaseNode`], the shared storage for identity, declared ports and bound
//! channels.
//!
//! ## Ports
//!
//! A node declares input and output port names. The declaration is
//! informational: the graph binds whatever its edges name, and an unwired port
//! simply has no channel. Builtin nodes treat a missing channel as "nothing to
//! do on that port".
//!
//! ## Running
//!
//! [`Node::start`] runs the node to completion. Implementations must:
//!
//! 1. race every blocking channel operation against the cancellation token
//!    (the [`Inlet`]/[`Outlet`] methods already do);
//! 2. return [`NodeError::Cancelled`] promptly once the token fires;
//! 3. close their outputs on every return path, exactly once. Holding the
//!    guard from [`BaseNode::close_guard`] for the whole run does this;
//! 4. never close a queue they do not produce.
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use pipeweave::node::{BaseNode, Node};
//! use pipeweave::error::NodeError;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Drain {
//!   base: BaseNode,
//! }
//!
//! #[async_trait]
//! impl Node for Drain {
//!   fn base(&self) -> &BaseNode {
//!     &self.base
//!   }
//!
//!   async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
//!     let _close = self.base.close_guard();
//!     let Some(inlet) = self.input("in") else {
//!       return Ok(());
//!     };
//!     while inlet.recv(&cancel).await?.is_some() {}
//!     Ok(())
//!   }
//! }
//! ```

use crate::channel::{Inlet, Outlet};
use crate::error::NodeError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A processing unit with named input and output ports.
///
/// Only [`base`](Node::base) and [`start`](Node::start) are required; identity,
/// port metadata, binding and closing delegate to the [`BaseNode`].
#[async_trait]
pub trait Node: Send + Sync {
  /// Shared port and identity storage.
  fn base(&self) -> &BaseNode;

  /// Runs the node until its inputs are exhausted, the token fires, or it
  /// fails.
  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError>;

  /// Stable identifier, unique within a graph.
  fn name(&self) -> &str {
    self.base().name()
  }

  /// Declared input port names.
  fn input_port_names(&self) -> &[String] {
    self.base().input_port_names()
  }

  /// Declared output port names.
  fn output_port_names(&self) -> &[String] {
    self.base().output_port_names()
  }

  /// Binds a queue to an input port.
  fn set_input(&self, port: &str, inlet: Inlet) {
    self.base().set_input(port, inlet);
  }

  /// Binds a queue to an output port.
  fn set_output(&self, port: &str, outlet: Outlet) {
    self.base().set_output(port, outlet);
  }

  /// The queue bound to an input port, if any.
  fn input(&self, port: &str) -> Option<Inlet> {
    self.base().input(port)
  }

  /// The queue bound to an output port, if any and not yet closed.
  fn output(&self, port: &str) -> Option<Outlet> {
    self.base().output(port)
  }

  /// Closes every bound output. Safe to call repeatedly and concurrently.
  fn close_outputs(&self) {
    self.base().close_outputs();
  }
}

/// Identity, declared ports and bound queues of a node.
pub struct BaseNode {
  name: String,
  input_port_names: Vec<String>,
  output_port_names: Vec<String>,
  inputs: Mutex<HashMap<String, Inlet>>,
  outputs: Mutex<HashMap<String, Outlet>>,
  closed: AtomicBool,
}

impl BaseNode {
  /// Creates a base node with the given id and declared ports.
  pub fn new(name: impl Into<String>, input_port_names: &[&str], output_port_names: &[&str]) -> Self {
    Self {
      name: name.into(),
      input_port_names: input_port_names.iter().map(|p| p.to_string()).collect(),
      output_port_names: output_port_names.iter().map(|p| p.to_string()).collect(),
      inputs: Mutex::new(HashMap::new()),
      outputs: Mutex::new(HashMap::new()),
      closed: AtomicBool::new(false),
    }
  }

  /// Returns the node's id.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Returns the declared input port names.
  pub fn input_port_names(&self) -> &[String] {
    &self.input_port_names
  }

  /// Returns the declared output port names.
  pub fn output_port_names(&self) -> &[String] {
    &self.output_port_names
  }

  /// Binds an input queue, replacing any earlier binding for the port.
  pub fn set_input(&self, port: &str, inlet: Inlet) {
    trace!(node = %self.name, port, source = inlet.label(), "input bound");
    lock(&self.inputs).insert(port.to_string(), inlet);
  }

  /// Binds an output queue, replacing any earlier binding for the port.
  pub fn set_output(&self, port: &str, outlet: Outlet) {
    trace!(node = %self.name, port, "output bound");
    lock(&self.outputs).insert(port.to_string(), outlet);
  }

  /// The queue bound to an input port.
  pub fn input(&self, port: &str) -> Option<Inlet> {
    lock(&self.inputs).get(port).cloned()
  }

  /// The queue bound to an output port, unless outputs are already closed.
  pub fn output(&self, port: &str) -> Option<Outlet> {
    lock(&self.outputs).get(port).cloned()
  }

  /// Names of the ports that actually have a bound input queue.
  pub fn bound_inputs(&self) -> Vec<String> {
    let mut ports: Vec<String> = lock(&self.inputs).keys().cloned().collect();
    ports.sort();
    ports
  }

  /// Names of the ports that actually have a bound output queue.
  pub fn bound_outputs(&self) -> Vec<String> {
    let mut ports: Vec<String> = lock(&self.outputs).keys().cloned().collect();
    ports.sort();
    ports
  }

  /// Releases every output queue held by this node.
  ///
  /// A queue reaches end-of-stream once its producer's last outlet is gone,
  /// so consumers drain what is buffered and then observe the close. Only the
  /// first call does anything.
  pub fn close_outputs(&self) {
    if self.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    let released: Vec<(String, Outlet)> = lock(&self.outputs).drain().collect();
    for (port, _outlet) in released {
      trace!(node = %self.name, port = %port, "output closed");
    }
  }

  /// Returns `true` once [`close_outputs`](Self::close_outputs) has run.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// A guard that closes this node's outputs when dropped.
  ///
  /// Take it first thing in [`Node::start`] so that success, cancellation and
  /// `?` early returns all close the outputs.
  #[must_use = "outputs close when the guard is dropped"]
  pub fn close_guard(&self) -> CloseGuard<'_> {
    CloseGuard { base: self }
  }
}

/// Closes a node's outputs on drop. See [`BaseNode::close_guard`].
pub struct CloseGuard<'a> {
  base: &'a BaseNode,
}

impl Drop for CloseGuard<'_> {
  fn drop(&mut self) {
    self.base.close_outputs();
  }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}
