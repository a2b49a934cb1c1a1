//! # Test Nodes
//!
//! Small nodes shared by the unit test suites.

use crate::error::NodeError;
use crate::message::{Message, message};
use crate::node::{BaseNode, Node};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Emits a fixed list of integers on `out`.
pub struct EmitNode {
  base: BaseNode,
  items: Vec<i64>,
}

impl EmitNode {
  pub fn new(name: &str, items: Vec<i64>) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(name, &[], &["out"]),
      items,
    })
  }
}

#[async_trait]
impl Node for EmitNode {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(out) = self.output("out") else {
      return Ok(());
    };
    for item in &self.items {
      out.send(message(*item), &cancel).await?;
    }
    Ok(())
  }
}

/// Collects every integer received on `in`.
pub struct CollectNode {
  base: BaseNode,
  pub items: Arc<Mutex<Vec<i64>>>,
}

impl CollectNode {
  pub fn new(name: &str) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(name, &["in"], &[]),
      items: Arc::new(Mutex::new(Vec::new())),
    })
  }

  pub fn collected(&self) -> Vec<i64> {
    self.items.lock().unwrap().clone()
  }
}

#[async_trait]
impl Node for CollectNode {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let Some(inlet) = self.input("in") else {
      return Ok(());
    };
    while let Some(item) = inlet.recv(&cancel).await? {
      self.items.lock().unwrap().push(*item.downcast_ref::<i64>().unwrap());
    }
    Ok(())
  }
}

/// Fails immediately with the given message.
pub struct FailNode {
  base: BaseNode,
  reason: String,
}

impl FailNode {
  pub fn new(name: &str, reason: &str) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(name, &[], &["out"]),
      reason: reason.to_string(),
    })
  }
}

#[async_trait]
impl Node for FailNode {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, _cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    Err(NodeError::Invalid(self.reason.clone()))
  }
}

/// Blocks until cancelled, counting how many times it observed cancellation.
pub struct BlockNode {
  base: BaseNode,
  pub cancelled: Arc<AtomicUsize>,
}

impl BlockNode {
  pub fn new(name: &str) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(name, &["in"], &["out"]),
      cancelled: Arc::new(AtomicUsize::new(0)),
    })
  }
}

#[async_trait]
impl Node for BlockNode {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    cancel.cancelled().await;
    self.cancelled.fetch_add(1, Ordering::SeqCst);
    Err(NodeError::Cancelled)
  }
}

/// Does nothing and succeeds.
pub struct IdleNode {
  base: BaseNode,
}

impl IdleNode {
  pub fn new(name: &str) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(name, &["in"], &["out"]),
    })
  }
}

#[async_trait]
impl Node for IdleNode {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, _cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    Ok(())
  }
}

/// Downcasts a received payload to `i64`.
pub fn as_i64(msg: &Message) -> i64 {
  *msg.downcast_ref::<i64>().unwrap()
}
