//! # File Walker Node
//!
//! A source node that walks one or more directory trees and emits every
//! regular file it finds.
//!
//! ## Ports
//!
//! - **Output**: `"files"` - absolute file paths as `PathBuf`
//!
//! ## Traversal
//!
//! Each root is made absolute and symlink-resolved, then walked depth-first
//! with an explicit stack. Directories are tracked by canonical path, so a
//! symlink that points back at an ancestor is entered at most once and the
//! walk always terminates.
//!
//! - A symlink to a directory pushes the directory's canonical path.
//! - A symlink to a regular file emits the symlink's own path.
//! - A dangling symlink is skipped.
//! - A directory that cannot be read aborts the node.
//!
//! Roots are handed to a pool of walkers through an unbuffered queue. The
//! first walker error stops the others.

use crate::channel::{Outlet, channel};
use crate::error::NodeError;
use crate::message::message;
use crate::node::{BaseNode, Node};
use crate::nodes::pool::run_workers;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Walks directory trees and emits the files inside them.
pub struct FileWalker {
  base: BaseNode,
  roots: Vec<PathBuf>,
  workers: usize,
}

impl FileWalker {
  /// Creates a walker over `roots`. An empty list walks the current directory.
  pub fn new(name: impl Into<String>, roots: Vec<PathBuf>) -> Self {
    let roots = if roots.is_empty() { vec![PathBuf::from(".")] } else { roots };
    Self {
      base: BaseNode::new(name, &[], &["files"]),
      roots,
      workers: 1,
    }
  }

  /// Sets how many roots are walked concurrently.
  #[must_use]
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }

  /// Returns the configured roots.
  pub fn roots(&self) -> &[PathBuf] {
    &self.roots
  }

  /// Returns the walker pool size.
  pub fn workers(&self) -> usize {
    self.workers
  }
}

#[async_trait]
impl Node for FileWalker {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(files) = self.output("files") else {
      return Ok(());
    };

    let (queue_tx, queue_rx) = channel(format!("{}.roots", self.name()), 0);
    let feed_token = cancel.clone();
    let feed = async move {
      for root in &self.roots {
        queue_tx.send(message(root.clone()), &feed_token).await?;
      }
      Ok::<(), NodeError>(())
    };
    // The walk owns the queue, so a finished pool disconnects the feeder.
    let walk = async move {
      run_workers(self.workers, &cancel, |worker, token| {
        let queue = queue_rx.clone();
        let files = files.clone();
        async move {
          while let Some(root) = queue.recv(&token).await? {
            let Some(root) = root.downcast_ref::<PathBuf>() else {
              continue;
            };
            debug!(worker, root = %root.display(), "walking root");
            walk_tree(root, &files, &token).await?;
          }
          Ok(())
        }
      })
      .await
    };

    let (fed, walked) = tokio::join!(feed, walk);
    walked?;
    // Once the walkers are gone the feeder only sees a closed queue.
    match fed {
      Err(NodeError::Disconnected { .. }) | Ok(()) => Ok(()),
      Err(err) => Err(err),
    }
  }
}

/// Walks one tree, sending every regular file to `out`.
///
/// # Errors
///
/// [`NodeError::Io`] when a directory cannot be read, or the outcome of a
/// failed send.
pub async fn walk_tree(root: &Path, out: &Outlet, cancel: &CancellationToken) -> Result<(), NodeError> {
  let root = if root.as_os_str().is_empty() { Path::new(".") } else { root };
  let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
  let root = resolve(&root).await;

  let mut visited: HashSet<PathBuf> = HashSet::new();
  let mut stack = vec![root];

  while let Some(dir) = stack.pop() {
    if cancel.is_cancelled() {
      return Err(NodeError::Cancelled);
    }
    if !visited.insert(resolve(&dir).await) {
      trace!(dir = %dir.display(), "already visited");
      continue;
    }

    let mut entries = tokio::fs::read_dir(&dir)
      .await
      .map_err(|e| NodeError::io(format!("read directory {}", dir.display()), e))?;
    while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|e| NodeError::io(format!("read directory {}", dir.display()), e))?
    {
      if cancel.is_cancelled() {
        return Err(NodeError::Cancelled);
      }
      let path = entry.path();
      let Ok(kind) = entry.file_type().await else {
        continue;
      };

      if kind.is_symlink() {
        let Ok(target) = tokio::fs::metadata(&path).await else {
          warn!(path = %path.display(), "dangling symlink skipped");
          continue;
        };
        if target.is_dir() {
          if let Ok(real) = tokio::fs::canonicalize(&path).await {
            stack.push(real);
          }
        } else if target.is_file() {
          out.send(message(path), cancel).await?;
        }
      } else if kind.is_dir() {
        stack.push(resolve(&path).await);
      } else if kind.is_file() {
        out.send(message(path), cancel).await?;
      }
    }
  }
  Ok(())
}

/// Canonical form of `path`, or `path` itself if it cannot be resolved.
async fn resolve(path: &Path) -> PathBuf {
  tokio::fs::canonicalize(path).await.unwrap_or_else(|_| path.to_path_buf())
}
