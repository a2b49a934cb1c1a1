//! # Pipeweave
//!
//! A concurrent dataflow engine: nodes connected by bounded queues, each node
//! running as its own task, all stopping together on the first failure.
//!
//! ## Key Features
//!
//! - **Flow-Based Programming**: declare nodes and edges, materialize once, run
//! - **Backpressure**: every edge is a bounded queue; a full queue stalls its producer
//! - **Cooperative Cancellation**: every queue operation races one shared token
//! - **Fail-Fast**: the first node error cancels the rest and is the one reported
//! - **Declarative Pipelines**: YAML or JSON documents built through a node registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipeweave::graph::Graph;
//! use pipeweave::nodes::{Md5Hasher, PathSource, Printer};
//! use pipeweave::runner::Runner;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), pipeweave::error::PipeError> {
//! let mut graph = Graph::new("md5");
//! graph.add(Arc::new(PathSource::new("src", vec!["Cargo.toml".into()])))?;
//! graph.add(Arc::new(Md5Hasher::new("hash", 4)))?;
//! graph.add(Arc::new(Printer::new("out", false)))?;
//! graph.connect("src", "paths", "hash", "paths", 0)?;
//! graph.connect("hash", "results", "out", "in", 0)?;
//! Runner::new(graph).run(CancellationToken::new()).await
//! # }
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Bounded queues that race every operation against cancellation.
pub mod channel;
/// Node, graph and loader error types.
pub mod error;
/// Graph construction and materialization.
pub mod graph;
/// Building graphs from pipeline documents.
pub mod loader;
/// Opaque payloads and the checksum result record.
pub mod message;
/// The node contract and shared port storage.
pub mod node;
/// Builtin nodes.
pub mod nodes;
/// The execution supervisor.
pub mod runner;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod node_test;

pub use channel::{Inlet, Outlet, channel};
pub use error::{NodeError, PipeError};
pub use graph::{Edge, FanOutPolicy, Graph};
pub use loader::LoadError;
pub use message::{ChecksumResult, Message, message};
pub use node::{BaseNode, Node};
pub use runner::Runner;
