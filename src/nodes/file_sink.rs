//! # File Sink Node
//!
//! Writes every incoming item to a file, one line per item.
//!
//! ## Ports
//!
//! - **Input**: `"in"` - any payload; lines come from [`render`]
//!
//! ## Modes
//!
//! With one worker the sink streams: each item is written as soon as it
//! arrives, in arrival order.
//!
//! With several workers each worker keeps the lines it received in memory.
//! Once the input is drained, or the run is cancelled, the sink writes one
//! section per worker in ascending worker order:
//!
//! ```text
//! == worker 1 ==
//! worker=1 <line>
//! == worker 2 ==
//! worker=2 <line>
//! ```
//!
//! A worker that received nothing gets no section. Every line consumed
//! before cancellation is still written.

use crate::channel::Inlet;
use crate::error::NodeError;
use crate::message::render;
use crate::node::{BaseNode, Node};
use crate::nodes::pool::run_workers;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Destination used when the sink is given an empty path.
pub const FALLBACK_SINK_PATH: &str = "md5-output.txt";

/// Writes items to a file.
pub struct FileSink {
  base: BaseNode,
  path: PathBuf,
  append: bool,
  workers: usize,
}

impl FileSink {
  /// Creates a single-worker sink that truncates `path`.
  pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    Self {
      base: BaseNode::new(name, &["in"], &[]),
      path: path.into(),
      append: false,
      workers: 1,
    }
  }

  /// Appends to the file instead of truncating it.
  #[must_use]
  pub fn with_append(mut self, append: bool) -> Self {
    self.append = append;
    self
  }

  /// Sets the worker count. More than one worker switches to grouped output.
  #[must_use]
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }

  /// The file this sink writes, after applying the fallback.
  pub fn path(&self) -> &Path {
    if self.path.as_os_str().is_empty() {
      Path::new(FALLBACK_SINK_PATH)
    } else {
      &self.path
    }
  }

  /// Returns the worker count.
  pub fn workers(&self) -> usize {
    self.workers
  }

  async fn open(&self) -> Result<BufWriter<File>, NodeError> {
    let path = self.path();
    let mut options = OpenOptions::new();
    options.create(true);
    if self.append {
      options.append(true);
    } else {
      options.write(true).truncate(true);
    }
    let file = options
      .open(path)
      .await
      .map_err(|e| NodeError::io(format!("open {}", path.display()), e))?;
    Ok(BufWriter::new(file))
  }

  async fn write_line(&self, out: &mut BufWriter<File>, line: &str) -> Result<(), NodeError> {
    let written = async {
      out.write_all(line.as_bytes()).await?;
      out.write_all(b"\n").await
    }
    .await;
    written.map_err(|e| NodeError::io(format!("write {}", self.path().display()), e))
  }

  async fn stream(&self, input: &Inlet, out: &mut BufWriter<File>, cancel: &CancellationToken) -> Result<(), NodeError> {
    while let Some(item) = input.recv(cancel).await? {
      self.write_line(out, &render(&item)).await?;
    }
    Ok(())
  }

  async fn grouped(&self, input: &Inlet, out: &mut BufWriter<File>, cancel: &CancellationToken) -> Result<(), NodeError> {
    let sections: Arc<Mutex<BTreeMap<usize, Vec<String>>>> = Arc::default();
    let collected = run_workers(self.workers, cancel, |worker, token| {
      let input = input.clone();
      let sections = Arc::clone(&sections);
      async move {
        let mut lines = Vec::new();
        let outcome = loop {
          match input.recv(&token).await {
            Ok(Some(item)) => lines.push(format!("worker={worker} {}", render(&item))),
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
          }
        };
        sections.lock().unwrap_or_else(PoisonError::into_inner).insert(worker, lines);
        outcome
      }
    })
    .await;

    let sections = std::mem::take(&mut *sections.lock().unwrap_or_else(PoisonError::into_inner));
    for (worker, lines) in sections.into_iter().filter(|(_, lines)| !lines.is_empty()) {
      debug!(worker, lines = lines.len(), "writing section");
      self.write_line(out, &format!("== worker {worker} ==")).await?;
      for line in &lines {
        self.write_line(out, line).await?;
      }
    }
    collected
  }
}

#[async_trait]
impl Node for FileSink {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(input) = self.input("in") else {
      return Ok(());
    };
    let mut out = self.open().await?;
    debug!(path = %self.path().display(), workers = self.workers, "sink opened");

    let written = if self.workers > 1 {
      self.grouped(&input, &mut out, &cancel).await
    } else {
      self.stream(&input, &mut out, &cancel).await
    };
    let flushed = out
      .flush()
      .await
      .map_err(|e| NodeError::io(format!("flush {}", self.path().display()), e));
    written.and(flushed)
  }
}
