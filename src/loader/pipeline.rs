//! # Pipeline Documents
//!
//! The serialized form of a graph and the code that turns it into one.
//!
//! ```yaml
//! nodes:
//!   - id: walk
//!     type: file_walker
//!     config: { dir: ".", workers: 2 }
//!   - id: hash
//!     type: md5_hasher
//! edges:
//!   - from: walk.files
//!     to: hash.paths
//!     buffer: 16
//! ```
//!
//! Every node is built and every edge resolved before anything runs. Any
//! problem is a [`LoadError`] and no node is started.

use crate::graph::Graph;
use crate::loader::LoadError;
use crate::loader::config::NodeConfig;
use crate::loader::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One entry of the `nodes` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
  /// Unique, non-empty node id.
  #[serde(default)]
  pub id: String,
  /// Registry key of the node type.
  #[serde(rename = "type", default)]
  pub kind: String,
  /// Type-specific settings.
  #[serde(default)]
  pub config: NodeConfig,
}

impl NodeSpec {
  /// Creates a node entry with an empty configuration.
  pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      kind: kind.into(),
      config: NodeConfig::new(),
    }
  }

  /// Replaces the configuration.
  #[must_use]
  pub fn with_config(mut self, config: NodeConfig) -> Self {
    self.config = config;
    self
  }
}

/// One entry of the `edges` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
  /// `<node>.<output port>`.
  pub from: String,
  /// `<node>.<input port>`.
  pub to: String,
  /// Queue capacity. Negative values are treated as zero.
  #[serde(default)]
  pub buffer: i64,
}

/// A whole pipeline document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
  /// Nodes in declaration order.
  #[serde(default)]
  pub nodes: Vec<NodeSpec>,
  /// Edges in declaration order.
  #[serde(default)]
  pub edges: Vec<EdgeSpec>,
}

/// Document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  /// YAML, the default.
  Yaml,
  /// JSON.
  Json,
}

impl Format {
  /// Picks the encoding from a file extension: `.json` is JSON, anything
  /// else is YAML.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
      _ => Format::Yaml,
    }
  }
}

impl PipelineSpec {
  /// Parses a document.
  pub fn parse(text: &str, format: Format) -> Result<Self, LoadError> {
    match format {
      Format::Yaml => serde_yaml::from_str(text).map_err(|e| LoadError::Parse(e.to_string())),
      Format::Json => serde_json::from_str(text).map_err(|e| LoadError::Parse(e.to_string())),
    }
  }

  /// Builds every node through `registry` and wires every edge.
  ///
  /// # Errors
  ///
  /// The first construction problem found, in document order: nodes are
  /// checked before edges.
  pub fn build(&self, name: &str, registry: &Registry) -> Result<Graph, LoadError> {
    let mut graph = Graph::new(name);
    let mut ids = HashSet::new();
    for spec in &self.nodes {
      if spec.id.is_empty() {
        return Err(LoadError::MissingId);
      }
      if !ids.insert(spec.id.as_str()) {
        return Err(LoadError::DuplicateId(spec.id.clone()));
      }
      let node = registry.build(spec)?;
      debug!(node = %spec.id, kind = %spec.kind, "node built");
      graph.add(node)?;
    }

    for edge in &self.edges {
      let (from, out_port) = split_port_ref(&edge.from)?;
      let (to, in_port) = split_port_ref(&edge.to)?;
      if !ids.contains(from) || !ids.contains(to) {
        return Err(LoadError::UnknownNode {
          from: edge.from.clone(),
          to: edge.to.clone(),
        });
      }
      graph.connect(from, out_port, to, in_port, edge.buffer)?;
    }
    Ok(graph)
  }
}

/// Splits `node.port` on the last `.`. Both halves must be non-empty, so node
/// ids may themselves contain dots.
pub fn split_port_ref(reference: &str) -> Result<(&str, &str), LoadError> {
  match reference.rsplit_once('.') {
    Some((node, port)) if !node.is_empty() && !port.is_empty() => Ok((node, port)),
    _ => Err(LoadError::MalformedPortRef(reference.to_string())),
  }
}

/// Parses `text` and builds the graph it describes.
pub fn load_from_str(text: &str, format: Format, registry: &Registry) -> Result<Graph, LoadError> {
  PipelineSpec::parse(text, format)?.build("pipeline", registry)
}

/// Reads, parses and builds a pipeline file. The graph is named after the
/// file stem.
pub fn load_from_file(path: impl AsRef<Path>, registry: &Registry) -> Result<Graph, LoadError> {
  let path = path.as_ref();
  let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("pipeline");
  PipelineSpec::parse(&text, Format::from_path(path))?.build(name, registry)
}
