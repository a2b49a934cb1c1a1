//! # Node Configuration
//!
//! Free-form per-node settings from a pipeline document. Values are a small
//! tagged union and every factory reads them through typed getters that take
//! an explicit default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
  /// `true` / `false`.
  Bool(bool),
  /// A whole number.
  Integer(i64),
  /// A floating-point number.
  Number(f64),
  /// A string.
  Text(String),
  /// A list of strings.
  List(Vec<String>),
}

impl ConfigValue {
  fn kind(&self) -> &'static str {
    match self {
      ConfigValue::Bool(_) => "boolean",
      ConfigValue::Integer(_) => "integer",
      ConfigValue::Number(_) => "number",
      ConfigValue::Text(_) => "string",
      ConfigValue::List(_) => "list",
    }
  }
}

impl From<bool> for ConfigValue {
  fn from(v: bool) -> Self {
    ConfigValue::Bool(v)
  }
}

impl From<i64> for ConfigValue {
  fn from(v: i64) -> Self {
    ConfigValue::Integer(v)
  }
}

impl From<f64> for ConfigValue {
  fn from(v: f64) -> Self {
    ConfigValue::Number(v)
  }
}

impl From<&str> for ConfigValue {
  fn from(v: &str) -> Self {
    ConfigValue::Text(v.to_string())
  }
}

impl From<Vec<&str>> for ConfigValue {
  fn from(v: Vec<&str>) -> Self {
    ConfigValue::List(v.into_iter().map(str::to_string).collect())
  }
}

/// A configuration value had the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config key '{key}' must be {expected}, found {found}")]
pub struct ConfigError {
  /// The offending key.
  pub key: String,
  /// What the getter accepts.
  pub expected: &'static str,
  /// What the document contained.
  pub found: &'static str,
}

/// The `config` map of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeConfig {
  values: BTreeMap<String, ConfigValue>,
}

impl NodeConfig {
  /// Creates an empty configuration.
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds or replaces a value.
  #[must_use]
  pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
    self.values.insert(key.into(), value.into());
    self
  }

  /// Returns the raw value for `key`.
  pub fn get(&self, key: &str) -> Option<&ConfigValue> {
    self.values.get(key)
  }

  /// Returns `true` if no keys are set.
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// A string value. Missing or empty strings yield `default`.
  pub fn text(&self, key: &str, default: &str) -> Result<String, ConfigError> {
    match self.get(key) {
      None => Ok(default.to_string()),
      Some(ConfigValue::Text(s)) if s.is_empty() => Ok(default.to_string()),
      Some(ConfigValue::Text(s)) => Ok(s.clone()),
      Some(other) => Err(mismatch(key, "a string", other)),
    }
  }

  /// A boolean value.
  pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
    match self.get(key) {
      None => Ok(default),
      Some(ConfigValue::Bool(b)) => Ok(*b),
      Some(other) => Err(mismatch(key, "a boolean", other)),
    }
  }

  /// An integer value. Floats with no fractional part are accepted.
  pub fn integer(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
    match self.get(key) {
      None => Ok(default),
      Some(ConfigValue::Integer(n)) => Ok(*n),
      #[allow(clippy::cast_possible_truncation)]
      Some(ConfigValue::Number(f)) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
      Some(other) => Err(mismatch(key, "an integer", other)),
    }
  }

  /// A list of strings. A single non-empty string becomes a one-item list;
  /// a missing key or an empty list yields `default`.
  pub fn text_list(&self, key: &str, default: &[String]) -> Result<Vec<String>, ConfigError> {
    match self.get(key) {
      Some(ConfigValue::Text(s)) if !s.is_empty() => Ok(vec![s.clone()]),
      Some(ConfigValue::List(items)) if !items.is_empty() => Ok(items.clone()),
      None | Some(ConfigValue::Text(_)) | Some(ConfigValue::List(_)) => Ok(default.to_vec()),
      Some(other) => Err(mismatch(key, "a string or list of strings", other)),
    }
  }
}

fn mismatch(key: &str, expected: &'static str, found: &ConfigValue) -> ConfigError {
  ConfigError {
    key: key.to_string(),
    expected,
    found: found.kind(),
  }
}
