//! # Printer Test Suite

use crate::channel::channel;
use crate::message::{ChecksumResult, message};
use crate::node::Node;
use crate::nodes::printer::Printer;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

async fn print_all(printer: Printer, items: Vec<crate::message::Message>) -> String {
  let (writer, mut reader) = tokio::io::duplex(64 * 1024);
  let printer = printer.with_writer(writer);
  let (tx, rx) = channel("in", items.len().max(1));
  printer.set_input("in", rx);

  let cancel = CancellationToken::new();
  for item in items {
    tx.send(item, &cancel).await.unwrap();
  }
  drop(tx);
  printer.start(cancel).await.unwrap();
  drop(printer);

  let mut text = String::new();
  reader.read_to_string(&mut text).await.unwrap();
  text
}

#[tokio::test]
async fn test_lines_carry_the_worker_prefix() {
  let text = print_all(
    Printer::new("print", false),
    vec![
      message(ChecksumResult::ok("/x", [0; 16])),
      message(ChecksumResult::failed("/y", "gone")),
    ],
  )
  .await;
  assert_eq!(
    text,
    format!("worker=1 {}  /x\nworker=1 ERROR: /y: gone\n", "0".repeat(32))
  );
}

#[tokio::test]
async fn test_quiet_mode_drains_silently() {
  let text = print_all(
    Printer::new("print", true),
    (0..10i64).map(message).collect(),
  )
  .await;
  assert!(text.is_empty());
}

#[tokio::test]
async fn test_several_workers_print_every_item_once() {
  let text = print_all(
    Printer::new("print", false).with_workers(3),
    (0..30i64).map(message).collect(),
  )
  .await;
  let mut values: Vec<i64> = text
    .lines()
    .map(|line| {
      let (prefix, value) = line.split_once(' ').unwrap();
      assert!(prefix.starts_with("worker="));
      value.parse().unwrap()
    })
    .collect();
  values.sort_unstable();
  assert_eq!(values, (0..30).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_cancelled_printer_reports_cancellation() {
  let printer = Printer::new("print", false).with_writer(tokio::io::sink());
  let (_tx, rx) = channel("in", 1);
  printer.set_input("in", rx);
  let cancel = CancellationToken::new();
  cancel.cancel();
  assert!(printer.start(cancel).await.unwrap_err().is_cancelled());
}
