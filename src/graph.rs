//! # Graph & Wiring
//!
//! A [`Graph`] holds node instances and edge declarations. Building it is
//! synchronous and allocates nothing; [`Graph::materialize`] then walks the
//! edges once and binds a bounded queue to every connected port.
//!
//! ## Materialization
//!
//! Queues are keyed by `(producing node, output port)`:
//!
//! - the first edge with a key creates the queue (with that edge's capacity)
//!   and binds its outlet to the producer;
//! - every edge with that key binds a clone of the same inlet to its consumer.
//!
//! So connecting one output to two inputs does **not** duplicate items: both
//! consumers compete for each item of a single queue. Use a
//! [`Tee`](crate::nodes::tee::Tee) for real duplication, or set
//! [`FanOutPolicy::Reject`] to refuse shared outputs altogether.
//!
//! ## Immutability
//!
//! Once materialized the graph is sealed: adding nodes, connecting edges or
//! materializing again all fail with [`PipeError::AlreadyMaterialized`].

use crate::channel::{Inlet, channel};
use crate::error::PipeError;
use crate::node::Node;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What materialization does when one output port feeds several edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutPolicy {
  /// Share one queue; consumers compete and each item reaches exactly one.
  #[default]
  Compete,
  /// Refuse the graph with [`PipeError::SharedOutput`].
  Reject,
}

/// A declared connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
  source_node: String,
  source_port: String,
  target_node: String,
  target_port: String,
  buffer: usize,
}

impl Edge {
  /// Returns the producing node's id.
  pub fn source_node(&self) -> &str {
    &self.source_node
  }

  /// Returns the producing output port.
  pub fn source_port(&self) -> &str {
    &self.source_port
  }

  /// Returns the consuming node's id.
  pub fn target_node(&self) -> &str {
    &self.target_node
  }

  /// Returns the consuming input port.
  pub fn target_port(&self) -> &str {
    &self.target_port
  }

  /// Returns the queue capacity requested by this edge.
  pub fn buffer(&self) -> usize {
    self.buffer
  }
}

impl fmt::Display for Edge {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}.{} -> {}.{} [{}]",
      self.source_node, self.source_port, self.target_node, self.target_port, self.buffer
    )
  }
}

/// Nodes plus the edges between their ports.
pub struct Graph {
  name: String,
  nodes: Vec<Arc<dyn Node>>,
  index: HashMap<String, usize>,
  edges: Vec<Edge>,
  fan_out: FanOutPolicy,
  materialized: bool,
}

impl Graph {
  /// Creates an empty graph.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      nodes: Vec::new(),
      index: HashMap::new(),
      edges: Vec::new(),
      fan_out: FanOutPolicy::default(),
      materialized: false,
    }
  }

  /// Sets how shared output ports are handled.
  #[must_use]
  pub fn with_fan_out(mut self, policy: FanOutPolicy) -> Self {
    self.fan_out = policy;
    self
  }

  /// Returns the graph's name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Returns the shared-output policy.
  pub fn fan_out(&self) -> FanOutPolicy {
    self.fan_out
  }

  /// Registers a node.
  ///
  /// # Errors
  ///
  /// - [`PipeError::DuplicateNode`] if a node with the same id was added.
  /// - [`PipeError::AlreadyMaterialized`] once the graph is sealed.
  pub fn add(&mut self, node: Arc<dyn Node>) -> Result<(), PipeError> {
    self.ensure_open()?;
    let id = node.name().to_string();
    if self.index.contains_key(&id) {
      return Err(PipeError::DuplicateNode(id));
    }
    self.index.insert(id, self.nodes.len());
    self.nodes.push(node);
    Ok(())
  }

  /// Registers several nodes, stopping at the first failure.
  pub fn add_all(&mut self, nodes: impl IntoIterator<Item = Arc<dyn Node>>) -> Result<(), PipeError> {
    for node in nodes {
      self.add(node)?;
    }
    Ok(())
  }

  /// Declares an edge `from.out_port -> to.in_port`.
  ///
  /// No queue is created yet. A negative `buffer` is clamped to zero.
  ///
  /// # Errors
  ///
  /// - [`PipeError::InvalidEdge`] if either node is not in the graph or a port
  ///   name is empty.
  /// - [`PipeError::AlreadyMaterialized`] once the graph is sealed.
  pub fn connect(
    &mut self,
    from: &str,
    out_port: &str,
    to: &str,
    in_port: &str,
    buffer: i64,
  ) -> Result<(), PipeError> {
    self.ensure_open()?;
    let invalid = |reason: &str| PipeError::InvalidEdge {
      from: from.to_string(),
      out_port: out_port.to_string(),
      to: to.to_string(),
      in_port: in_port.to_string(),
      reason: reason.to_string(),
    };
    if !self.index.contains_key(from) {
      return Err(invalid("unknown source node"));
    }
    if !self.index.contains_key(to) {
      return Err(invalid("unknown target node"));
    }
    if out_port.is_empty() || in_port.is_empty() {
      return Err(invalid("empty port name"));
    }
    let buffer = usize::try_from(buffer.max(0)).unwrap_or(usize::MAX);
    self.edges.push(Edge {
      source_node: from.to_string(),
      source_port: out_port.to_string(),
      target_node: to.to_string(),
      target_port: in_port.to_string(),
      buffer,
    });
    Ok(())
  }

  /// Allocates one queue per connected output port and binds it into the
  /// producing and consuming nodes. Must run exactly once, before any node
  /// starts.
  ///
  /// # Errors
  ///
  /// - [`PipeError::AlreadyMaterialized`] on a second call.
  /// - [`PipeError::SharedOutput`] under [`FanOutPolicy::Reject`] when an
  ///   output port feeds more than one edge. Nothing is bound in that case.
  pub fn materialize(&mut self) -> Result<(), PipeError> {
    self.ensure_open()?;

    if self.fan_out == FanOutPolicy::Reject {
      let mut seen = HashSet::new();
      for edge in &self.edges {
        if !seen.insert((edge.source_node(), edge.source_port())) {
          return Err(PipeError::SharedOutput {
            node: edge.source_node.clone(),
            port: edge.source_port.clone(),
          });
        }
      }
    }

    let mut queues: HashMap<(String, String), Inlet> = HashMap::new();
    for edge in &self.edges {
      let key = (edge.source_node.clone(), edge.source_port.clone());
      let inlet = if let Some(inlet) = queues.get(&key).cloned() {
        warn!(
          graph = %self.name,
          output = %inlet.label(),
          consumer = %edge.target_node,
          "output feeds several inputs; consumers will compete for items"
        );
        inlet
      } else {
        let label = format!("{}.{}", edge.source_node, edge.source_port);
        let (outlet, inlet) = channel(label, edge.buffer);
        self.node_by_id(&edge.source_node).set_output(&edge.source_port, outlet);
        queues.insert(key, inlet.clone());
        inlet
      };
      self.node_by_id(&edge.target_node).set_input(&edge.target_port, inlet);
      debug!(graph = %self.name, edge = %edge, "edge bound");
    }

    self.materialized = true;
    debug!(graph = %self.name, nodes = self.nodes.len(), queues = queues.len(), "graph materialized");
    Ok(())
  }

  /// Returns `true` once [`materialize`](Self::materialize) has succeeded.
  pub fn is_materialized(&self) -> bool {
    self.materialized
  }

  /// Returns every node, in insertion order.
  pub fn nodes(&self) -> &[Arc<dyn Node>] {
    &self.nodes
  }

  /// Returns every edge, in declaration order.
  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  /// Looks a node up by id.
  pub fn node(&self, id: &str) -> Option<&Arc<dyn Node>> {
    self.index.get(id).map(|&i| &self.nodes[i])
  }

  fn node_by_id(&self, id: &str) -> &Arc<dyn Node> {
    // `connect` only records edges whose endpoints are indexed.
    &self.nodes[self.index[id]]
  }

  fn ensure_open(&self) -> Result<(), PipeError> {
    if self.materialized {
      return Err(PipeError::AlreadyMaterialized(self.name.clone()));
    }
    Ok(())
  }
}

impl fmt::Debug for Graph {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Graph")
      .field("name", &self.name)
      .field("nodes", &self.index.keys().collect::<Vec<_>>())
      .field("edges", &self.edges)
      .field("fan_out", &self.fan_out)
      .field("materialized", &self.materialized)
      .finish()
  }
}
