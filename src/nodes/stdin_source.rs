//! # Stdin Source Node
//!
//! Prompts for a single file path and emits it on `"paths"`.
//!
//! The line is trimmed and made absolute. It must name an existing path that
//! is not a directory. An empty line fails the node unless empty input is
//! allowed, in which case nothing is emitted.

use crate::error::NodeError;
use crate::message::message;
use crate::node::{BaseNode, Node};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Prompt shown when none is configured.
pub const DEFAULT_PROMPT: &str = "Enter file path: ";

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Reads one path from an interactive reader.
pub struct StdinSource {
  base: BaseNode,
  prompt: String,
  allow_empty: bool,
  io: Mutex<(Reader, Writer)>,
}

impl StdinSource {
  /// Creates a source reading standard input and prompting on standard output.
  pub fn new(name: impl Into<String>, prompt: impl Into<String>, allow_empty: bool) -> Self {
    let prompt = prompt.into();
    Self {
      base: BaseNode::new(name, &[], &["paths"]),
      prompt: if prompt.is_empty() { DEFAULT_PROMPT.to_string() } else { prompt },
      allow_empty,
      io: Mutex::new((Box::new(BufReader::new(tokio::io::stdin())), Box::new(tokio::io::stdout()))),
    }
  }

  /// Replaces the input reader and prompt writer.
  #[must_use]
  pub fn with_io(
    mut self,
    reader: impl AsyncBufRead + Send + Unpin + 'static,
    writer: impl AsyncWrite + Send + Unpin + 'static,
  ) -> Self {
    self.io = Mutex::new((Box::new(reader), Box::new(writer)));
    self
  }

  /// Returns the prompt text.
  pub fn prompt(&self) -> &str {
    &self.prompt
  }

  async fn read_line(&self, cancel: &CancellationToken) -> Result<String, NodeError> {
    let mut io = self.io.lock().await;
    let (reader, writer) = &mut *io;
    writer
      .write_all(self.prompt.as_bytes())
      .await
      .map_err(|e| NodeError::io("write prompt", e))?;
    writer.flush().await.map_err(|e| NodeError::io("write prompt", e))?;

    let mut line = String::new();
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(NodeError::Cancelled),
      read = reader.read_line(&mut line) => {
        read.map_err(|e| NodeError::io("read input", e))?;
        Ok(line.trim().to_string())
      }
    }
  }
}

#[async_trait]
impl Node for StdinSource {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(out) = self.output("paths") else {
      return Ok(());
    };

    let line = self.read_line(&cancel).await?;
    if line.is_empty() {
      if self.allow_empty {
        debug!("empty input accepted");
        return Ok(());
      }
      return Err(NodeError::Invalid("empty input".to_string()));
    }

    let path = std::path::absolute(&line).map_err(|e| NodeError::io(format!("resolve {line}"), e))?;
    let meta = tokio::fs::metadata(&path)
      .await
      .map_err(|e| NodeError::io(format!("stat {}", path.display()), e))?;
    if meta.is_dir() {
      return Err(NodeError::Invalid(format!("path is a directory: {}", path.display())));
    }
    out.send(message(path), &cancel).await
  }
}
