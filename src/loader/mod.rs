//! # Pipeline Loader
//!
//! Builds a [`Graph`](crate::graph::Graph) from a YAML or JSON document.
//!
//! - [`config`]: per-node configuration values and typed getters
//! - [`registry`]: node type name to factory mapping
//! - [`builtins`]: a registry holding every builtin node
//! - [`pipeline`]: the document model and the load functions
//!
//! ```rust,no_run
//! use pipeweave::loader::{Defaults, builtins, load_from_file};
//!
//! let registry = builtins(Defaults::default());
//! let graph = load_from_file("demos/md5/pipeline.yml", &registry)?;
//! # Ok::<(), pipeweave::loader::LoadError>(())
//! ```

pub mod builtins;
pub mod config;
pub mod pipeline;
pub mod registry;


pub use builtins::{Defaults, builtins};
pub use config::{ConfigError, ConfigValue, NodeConfig};
pub use pipeline::{EdgeSpec, Format, NodeSpec, PipelineSpec, load_from_file, load_from_str, split_port_ref};
pub use registry::{NodeFactory, Registry};

use crate::error::PipeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a document into a graph.
#[derive(Debug, Error)]
pub enum LoadError {
  /// The document could not be read.
  #[error("read {}: {source}", path.display())]
  Read {
    /// The file that was opened.
    path: PathBuf,
    /// The underlying error.
    #[source]
    source: io::Error,
  },

  /// The document is not valid YAML/JSON or does not match the schema.
  #[error("parse pipeline: {0}")]
  Parse(String),

  /// A node entry has no id.
  #[error("node id is required")]
  MissingId,

  /// Two node entries share an id.
  #[error("duplicate node id: {0}")]
  DuplicateId(String),

  /// No factory is registered for the type.
  #[error("unknown node type: {0}")]
  UnknownType(String),

  /// An edge endpoint is not of the form `node.port`.
  #[error("invalid port reference {0:?}; expected node.port")]
  MalformedPortRef(String),

  /// An edge endpoint names a node that is not declared.
  #[error("unknown node id in edge: {from:?} -> {to:?}")]
  UnknownNode {
    /// The edge's source reference.
    from: String,
    /// The edge's target reference.
    to: String,
  },

  /// A node's configuration is invalid.
  #[error("node '{node}': {source}")]
  Config {
    /// The node being built.
    node: String,
    /// What was wrong.
    #[source]
    source: ConfigError,
  },

  /// The graph rejected a node or edge.
  #[error(transparent)]
  Graph(#[from] PipeError),
}
