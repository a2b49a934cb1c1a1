//! # MD5 Hasher Node
//!
//! A transform node that checksums every incoming path with a fixed pool of
//! workers.
//!
//! ## Ports
//!
//! - **Input**: `"paths"` - file paths (`PathBuf` or `String`)
//! - **Output**: `"results"` - one [`ChecksumResult`] per path
//!
//! An unreadable path is not a node failure: its result carries the error
//! and is forwarded like any other. Results leave in completion order, not
//! input order.

use crate::error::NodeError;
use crate::message::{ChecksumResult, DIGEST_LEN, Message, message, path_of};
use crate::node::{BaseNode, Node};
use crate::nodes::pool::map_pool;
use async_trait::async_trait;
use md5::{Digest, Md5};
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Worker count used when none (or zero) is configured.
pub const DEFAULT_HASH_WORKERS: usize = 10;

const READ_CHUNK: usize = 64 * 1024;

/// Checksums paths concurrently.
pub struct Md5Hasher {
  base: BaseNode,
  workers: usize,
}

impl Md5Hasher {
  /// Creates a hasher with `workers` concurrent workers.
  pub fn new(name: impl Into<String>, workers: usize) -> Self {
    let workers = if workers == 0 { DEFAULT_HASH_WORKERS } else { workers };
    Self {
      base: BaseNode::new(name, &["paths"], &["results"]),
      workers,
    }
  }

  /// Returns the worker pool size.
  pub fn workers(&self) -> usize {
    self.workers
  }
}

#[async_trait]
impl Node for Md5Hasher {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let (Some(paths), Some(results)) = (self.input("paths"), self.output("results")) else {
      return Ok(());
    };
    map_pool(self.workers, paths, results, &cancel, |item| async move {
      message(checksum_message(&item).await)
    })
    .await
  }
}

async fn checksum_message(item: &Message) -> ChecksumResult {
  let Some(path) = path_of(item) else {
    return ChecksumResult::failed("", "payload is not a path");
  };
  match md5_file(&path).await {
    Ok(digest) => {
      trace!(path = %path.display(), "checksummed");
      ChecksumResult::ok(path, digest)
    }
    Err(err) => ChecksumResult::failed(path, err.to_string()),
  }
}

/// Streams a file through MD5.
pub async fn md5_file(path: &Path) -> io::Result<[u8; DIGEST_LEN]> {
  let mut file = tokio::fs::File::open(path).await?;
  let mut hasher = Md5::new();
  let mut buf = vec![0u8; READ_CHUNK];
  loop {
    let n = file.read(&mut buf).await?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }
  Ok(hasher.finalize().into())
}
