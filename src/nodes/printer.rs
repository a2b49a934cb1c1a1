//! # Printer Node
//!
//! A terminal sink that prints each item as `worker=<n> <line>` on standard
//! output. In quiet mode it drains its input without printing.

use crate::error::NodeError;
use crate::message::render;
use crate::node::{BaseNode, Node};
use crate::nodes::pool::run_workers;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Prints items with a pool of competing workers.
pub struct Printer {
  base: BaseNode,
  quiet: bool,
  workers: usize,
  out: SharedWriter,
}

impl Printer {
  /// Creates a single-worker printer writing to standard output.
  pub fn new(name: impl Into<String>, quiet: bool) -> Self {
    Self {
      base: BaseNode::new(name, &["in"], &[]),
      quiet,
      workers: 1,
      out: Arc::new(Mutex::new(Box::new(tokio::io::stdout()))),
    }
  }

  /// Sets the worker count.
  #[must_use]
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }

  /// Redirects output, e.g. into an in-memory buffer.
  #[must_use]
  pub fn with_writer(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
    self.out = Arc::new(Mutex::new(Box::new(writer)));
    self
  }

  /// Returns `true` if items are drained without printing.
  pub fn is_quiet(&self) -> bool {
    self.quiet
  }

  /// Returns the worker count.
  pub fn workers(&self) -> usize {
    self.workers
  }
}

#[async_trait]
impl Node for Printer {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(input) = self.input("in") else {
      return Ok(());
    };
    let quiet = self.quiet;
    run_workers(self.workers, &cancel, |worker, token| {
      let input = input.clone();
      let out = Arc::clone(&self.out);
      async move {
        while let Some(item) = input.recv(&token).await? {
          if quiet {
            continue;
          }
          let line = format!("worker={worker} {}\n", render(&item));
          let mut out = out.lock().await;
          out
            .write_all(line.as_bytes())
            .await
            .map_err(|e| NodeError::io("write to standard output", e))?;
          out.flush().await.map_err(|e| NodeError::io("flush standard output", e))?;
        }
        Ok(())
      }
    })
    .await
  }
}
