//! # Messages
//!
//! The engine moves opaque payloads. A [`Message`] is an `Arc<dyn Any + Send + Sync>`
//! so that a tee can hand the same value to two outputs without copying it, and
//! so that nodes agree on concrete shapes only by port-naming convention.
//!
//! The builtin nodes use two shapes:
//!
//! - a file-system path, carried as `PathBuf` (or `String`)
//! - a [`ChecksumResult`] produced by the hasher

use std::any::Any;
use std::fmt::{self, Display, Formatter, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

/// An opaque, cheaply clonable payload travelling over a channel.
pub type Message = Arc<dyn Any + Send + Sync>;

/// Wraps any payload into a [`Message`].
pub fn message<T: Any + Send + Sync>(payload: T) -> Message {
  Arc::new(payload)
}

/// Length in bytes of an MD5 digest.
pub const DIGEST_LEN: usize = 16;

/// Result of checksumming one path.
///
/// A failed item is still a result: `error` carries the description and
/// `digest` stays zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumResult {
  /// The path that was read.
  pub path: PathBuf,
  /// MD5 digest of the file contents.
  pub digest: [u8; DIGEST_LEN],
  /// Why the path could not be checksummed, if it could not.
  pub error: Option<String>,
}

impl ChecksumResult {
  /// A successful result.
  pub fn ok(path: impl Into<PathBuf>, digest: [u8; DIGEST_LEN]) -> Self {
    Self {
      path: path.into(),
      digest,
      error: None,
    }
  }

  /// A per-item failure.
  pub fn failed(path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      digest: [0; DIGEST_LEN],
      error: Some(error.into()),
    }
  }

  /// Lower-case hex rendering of the digest.
  #[must_use]
  pub fn hex_digest(&self) -> String {
    self.digest.iter().fold(String::with_capacity(DIGEST_LEN * 2), |mut s, b| {
      let _ = write!(s, "{b:02x}");
      s
    })
  }

  /// Returns `true` if this result carries a per-item error.
  #[must_use]
  pub fn is_err(&self) -> bool {
    self.error.is_some()
  }
}

impl Display for ChecksumResult {
  /// `<hex>  <path>` for successes and `ERROR: <path>: <message>` for failures,
  /// the layout `md5sum` users expect.
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match &self.error {
      Some(err) => write!(f, "ERROR: {}: {}", self.path.display(), err),
      None => write!(f, "{}  {}", self.hex_digest(), self.path.display()),
    }
  }
}

/// Interprets a payload as a file-system path.
///
/// Accepts `PathBuf` and `String` payloads. Anything else yields `None`.
pub fn path_of(msg: &Message) -> Option<PathBuf> {
  if let Some(p) = msg.downcast_ref::<PathBuf>() {
    return Some(p.clone());
  }
  if let Some(s) = msg.downcast_ref::<String>() {
    return Some(PathBuf::from(s));
  }
  msg.downcast_ref::<&'static str>().map(PathBuf::from)
}

/// Renders a payload as a single output line for printers and sinks.
pub fn render(msg: &Message) -> String {
  if let Some(r) = msg.downcast_ref::<ChecksumResult>() {
    return r.to_string();
  }
  if let Some(p) = msg.downcast_ref::<PathBuf>() {
    return p.display().to_string();
  }
  if let Some(s) = msg.downcast_ref::<String>() {
    return s.clone();
  }
  if let Some(s) = msg.downcast_ref::<&'static str>() {
    return (*s).to_string();
  }
  if let Some(n) = msg.downcast_ref::<i64>() {
    return n.to_string();
  }
  if let Some(n) = msg.downcast_ref::<i32>() {
    return n.to_string();
  }
  if let Some(n) = msg.downcast_ref::<u64>() {
    return n.to_string();
  }
  if let Some(n) = msg.downcast_ref::<usize>() {
    return n.to_string();
  }
  if let Some(n) = msg.downcast_ref::<f64>() {
    return n.to_string();
  }
  if let Some(b) = msg.downcast_ref::<bool>() {
    return b.to_string();
  }
  "<opaque>".to_string()
}
