//! # Builtin Factories
//!
//! A [`Registry`] pre-populated with every node in [`crate::nodes`]. Factory
//! defaults that depend on the command line come from [`Defaults`].
//!
//! | type | config keys (default) |
//! |---|---|
//! | `file_walker` | `dir` (defaults dir), `workers` (1) |
//! | `md5_hasher` | `workers` (defaults workers) |
//! | `tee` | |
//! | `file_sink` | `path` (`output.txt`), `append` (false), `workers` (1) |
//! | `printer` | `quiet` (defaults quiet), `workers` (1) |
//! | `path_source` | `paths` (required) |
//! | `stdin_source` | `prompt`, `allow_empty` (false) |

use crate::loader::LoadError;
use crate::loader::config::ConfigError;
use crate::loader::pipeline::NodeSpec;
use crate::loader::registry::Registry;
use crate::node::Node;
use crate::nodes::stdin_source::DEFAULT_PROMPT;
use crate::nodes::{FileSink, FileWalker, Md5Hasher, PathSource, Printer, StdinSource, Tee};
use std::path::PathBuf;
use std::sync::Arc;

/// Sink destination used when `path` is not configured.
pub const DEFAULT_SINK_PATH: &str = "output.txt";

/// Defaults shared by the builtin factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
  /// Root walked by a `file_walker` with no `dir`.
  pub dir: PathBuf,
  /// Worker count of an `md5_hasher` with no `workers`.
  pub workers: usize,
  /// Whether printers are quiet unless configured otherwise.
  pub quiet: bool,
}

impl Default for Defaults {
  fn default() -> Self {
    Self {
      dir: PathBuf::from("."),
      workers: 10,
      quiet: false,
    }
  }
}

/// Returns a registry holding every builtin node type.
pub fn builtins(defaults: Defaults) -> Registry {
  let defaults = Arc::new(defaults);
  let mut registry = Registry::new();

  let d = Arc::clone(&defaults);
  registry.register("file_walker", move |spec| file_walker(spec, &d));
  let d = Arc::clone(&defaults);
  registry.register("md5_hasher", move |spec| md5_hasher(spec, &d));
  let d = Arc::clone(&defaults);
  registry.register("printer", move |spec| printer(spec, &d));
  registry.register("tee", tee);
  registry.register("file_sink", file_sink);
  registry.register("path_source", path_source);
  registry.register("stdin_source", stdin_source);
  registry
}

fn require_id(spec: &NodeSpec) -> Result<&str, LoadError> {
  if spec.id.is_empty() {
    return Err(LoadError::MissingId);
  }
  Ok(&spec.id)
}

fn config_err(spec: &NodeSpec) -> impl Fn(ConfigError) -> LoadError + '_ {
  move |source| LoadError::Config {
    node: spec.id.clone(),
    source,
  }
}

/// Negative counts mean "unset".
fn count(n: i64) -> usize {
  usize::try_from(n).unwrap_or(0)
}

fn file_walker(spec: &NodeSpec, defaults: &Defaults) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  let fallback = if defaults.dir.as_os_str().is_empty() {
    ".".to_string()
  } else {
    defaults.dir.to_string_lossy().into_owned()
  };
  let dirs = spec.config.text_list("dir", &[fallback]).map_err(config_err(spec))?;
  let workers = spec.config.integer("workers", 1).map_err(config_err(spec))?;
  let roots = dirs.into_iter().map(PathBuf::from).collect();
  Ok(Arc::new(FileWalker::new(id, roots).with_workers(count(workers))))
}

fn md5_hasher(spec: &NodeSpec, defaults: &Defaults) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  let fallback = i64::try_from(defaults.workers).unwrap_or(i64::MAX);
  let workers = spec.config.integer("workers", fallback).map_err(config_err(spec))?;
  Ok(Arc::new(Md5Hasher::new(id, count(workers))))
}

fn printer(spec: &NodeSpec, defaults: &Defaults) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  let quiet = spec.config.flag("quiet", defaults.quiet).map_err(config_err(spec))?;
  let workers = spec.config.integer("workers", 1).map_err(config_err(spec))?;
  Ok(Arc::new(Printer::new(id, quiet).with_workers(count(workers))))
}

fn tee(spec: &NodeSpec) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  Ok(Arc::new(Tee::new(id)))
}

fn file_sink(spec: &NodeSpec) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  let path = spec.config.text("path", DEFAULT_SINK_PATH).map_err(config_err(spec))?;
  let append = spec.config.flag("append", false).map_err(config_err(spec))?;
  let workers = spec.config.integer("workers", 1).map_err(config_err(spec))?;
  Ok(Arc::new(
    FileSink::new(id, path).with_append(append).with_workers(count(workers)),
  ))
}

fn path_source(spec: &NodeSpec) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  let paths = spec.config.text_list("paths", &[]).map_err(config_err(spec))?;
  if paths.is_empty() {
    return Err(LoadError::Config {
      node: spec.id.clone(),
      source: ConfigError {
        key: "paths".to_string(),
        expected: "a non-empty list of paths",
        found: "nothing",
      },
    });
  }
  Ok(Arc::new(PathSource::new(id, paths.into_iter().map(PathBuf::from).collect())))
}

fn stdin_source(spec: &NodeSpec) -> Result<Arc<dyn Node>, LoadError> {
  let id = require_id(spec)?;
  let prompt = spec.config.text("prompt", DEFAULT_PROMPT).map_err(config_err(spec))?;
  let allow_empty = spec.config.flag("allow_empty", false).map_err(config_err(spec))?;
  Ok(Arc::new(StdinSource::new(id, prompt, allow_empty)))
}
