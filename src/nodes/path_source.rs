//! # Path Source Node
//!
//! Emits a fixed list of paths on `"paths"`, in order.

use crate::error::NodeError;
use crate::message::message;
use crate::node::{BaseNode, Node};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Emits preconfigured paths.
pub struct PathSource {
  base: BaseNode,
  paths: Vec<PathBuf>,
}

impl PathSource {
  /// Creates a source for `paths`.
  pub fn new(name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
    Self {
      base: BaseNode::new(name, &[], &["paths"]),
      paths,
    }
  }

  /// Returns the paths this source emits.
  pub fn paths(&self) -> &[PathBuf] {
    &self.paths
  }
}

#[async_trait]
impl Node for PathSource {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(out) = self.output("paths") else {
      return Ok(());
    };
    for path in &self.paths {
      out.send(message(path.clone()), &cancel).await?;
    }
    Ok(())
  }
}
