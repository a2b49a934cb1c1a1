//! # Node Test Suite
//!
//! Port metadata, binding and the exactly-once close contract of [`BaseNode`].

use crate::channel::channel;
use crate::node::{BaseNode, Node};
use crate::testing::IdleNode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[test]
fn test_base_node_metadata() {
  let base = BaseNode::new("tee", &["in"], &["out1", "out2"]);
  assert_eq!(base.name(), "tee");
  assert_eq!(base.input_port_names(), &["in".to_string()]);
  assert_eq!(base.output_port_names(), &["out1".to_string(), "out2".to_string()]);
  assert!(base.input("in").is_none());
  assert!(base.output("out1").is_none());
  assert!(!base.is_closed());
}

#[test]
fn test_binding_is_not_checked_against_declared_ports() {
  let base = BaseNode::new("n", &["in"], &["out"]);
  let (tx, rx) = channel("n.extra", 1);
  base.set_output("extra", tx);
  base.set_input("side", rx);
  assert!(base.output("extra").is_some());
  assert!(base.input("side").is_some());
  assert_eq!(base.bound_outputs(), vec!["extra".to_string()]);
  assert_eq!(base.bound_inputs(), vec!["side".to_string()]);
}

#[tokio::test]
async fn test_close_outputs_signals_end_of_stream() {
  let cancel = CancellationToken::new();
  let node = IdleNode::new("idle");
  let (tx, rx) = channel("idle.out", 1);
  node.set_output("out", tx);

  node.close_outputs();
  assert!(node.base().is_closed());
  assert!(node.output("out").is_none());
  assert!(rx.recv(&cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn test_close_outputs_repeated_and_concurrent() {
  let cancel = CancellationToken::new();
  let node = IdleNode::new("idle");
  let (tx, rx) = channel("idle.out", 1);
  node.set_output("out", tx);

  let handles: Vec<_> = (0..16)
    .map(|_| {
      let node = Arc::clone(&node);
      std::thread::spawn(move || node.close_outputs())
    })
    .collect();
  for h in handles {
    h.join().unwrap();
  }
  node.close_outputs();

  assert!(node.base().is_closed());
  assert!(rx.recv(&cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn test_close_guard_closes_on_start_return() {
  let cancel = CancellationToken::new();
  let node = IdleNode::new("idle");
  let (tx, rx) = channel("idle.out", 1);
  node.set_output("out", tx);

  node.start(cancel.clone()).await.unwrap();
  assert!(node.base().is_closed());
  assert!(rx.recv(&cancel).await.unwrap().is_none());
}
