//! # Node Registry
//!
//! Maps a node type name to the factory that builds it. A registry is an
//! ordinary value: build one per set of defaults and hand it to the loader.

use crate::loader::LoadError;
use crate::loader::pipeline::NodeSpec;
use crate::node::Node;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Builds a node from its document entry.
pub type NodeFactory = Box<dyn Fn(&NodeSpec) -> Result<Arc<dyn Node>, LoadError> + Send + Sync>;

/// Type name to factory mapping.
#[derive(Default)]
pub struct Registry {
  factories: HashMap<String, NodeFactory>,
}

impl Registry {
  /// Creates an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `factory` under `node_type`, replacing any previous entry.
  pub fn register<F>(&mut self, node_type: impl Into<String>, factory: F)
  where
    F: Fn(&NodeSpec) -> Result<Arc<dyn Node>, LoadError> + Send + Sync + 'static,
  {
    let node_type = node_type.into();
    trace!(node_type = %node_type, "factory registered");
    self.factories.insert(node_type, Box::new(factory));
  }

  /// Returns `true` if `node_type` has a factory.
  pub fn contains(&self, node_type: &str) -> bool {
    self.factories.contains_key(node_type)
  }

  /// Registered type names, sorted.
  pub fn types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
    types.sort_unstable();
    types
  }

  /// Builds the node described by `spec`.
  ///
  /// # Errors
  ///
  /// [`LoadError::UnknownType`] if no factory is registered for the type,
  /// otherwise whatever the factory reports.
  pub fn build(&self, spec: &NodeSpec) -> Result<Arc<dyn Node>, LoadError> {
    let factory = self
      .factories
      .get(&spec.kind)
      .ok_or_else(|| LoadError::UnknownType(spec.kind.clone()))?;
    factory(spec)
  }
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registry").field("types", &self.types()).finish()
  }
}
