//! # Tee Node
//!
//! Duplicates every input item onto two outputs.
//!
//! ## Ports
//!
//! - **Input**: `"in"`
//! - **Outputs**: `"out1"`, `"out2"` - both receive every item, in input order
//!
//! The same [`Message`](crate::message::Message) is sent first to `out1` and
//! then to `out2`. The tee holds no buffer of its own, so a slow consumer on
//! either side stalls both. Use it when every consumer must see every item;
//! wiring one output to two inputs makes the consumers compete instead.

use crate::error::NodeError;
use crate::node::{BaseNode, Node};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sends each input item to both outputs.
pub struct Tee {
  base: BaseNode,
}

impl Tee {
  /// Creates a tee.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      base: BaseNode::new(name, &["in"], &["out1", "out2"]),
    }
  }
}

#[async_trait]
impl Node for Tee {
  fn base(&self) -> &BaseNode {
    &self.base
  }

  async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
    let _close = self.base.close_guard();
    let (Some(input), Some(first), Some(second)) = (self.input("in"), self.output("out1"), self.output("out2")) else {
      return Ok(());
    };
    while let Some(item) = input.recv(&cancel).await? {
      first.send(Arc::clone(&item), &cancel).await?;
      second.send(item, &cancel).await?;
    }
    Ok(())
  }
}
