//! # Bounded Channels
//!
//! Every edge of a materialized graph is one bounded FIFO queue of
//! [`Message`]s. The producing node holds the [`Outlet`]; every consuming node
//! holds a clone of the [`Inlet`].
//!
//! ## Ownership
//!
//! - **Outlet**: owned by the producing node. The queue reaches end-of-stream
//!   once the producer has closed its outputs (dropped its outlets) and every
//!   worker clone is gone. Only the producer can close a queue.
//! - **Inlet**: clonable. Clones compete for items, so an item is delivered to
//!   exactly one holder. This is what shared-channel fan-out and internal worker
//!   pools rely on.
//!
//! ## Cancellation
//!
//! [`Outlet::send`] and [`Inlet::recv`] race the queue operation against a
//! [`CancellationToken`], cancellation first, so no task blocks past the
//! signal. Both operations are cancel-safe: losing the race never drops an item.
//!
//! ## Rendezvous
//!
//! A capacity of zero is a rendezvous: [`Outlet::send`] returns only once a
//! consumer has taken the item. A rendezvous send cancelled after the item was
//! offered leaves it queued for the next receiver.

use crate::error::NodeError;
use crate::message::Message;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Largest capacity a queue can have. Larger requests are clamped to it.
pub const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

// An item plus, on rendezvous queues, the hand-off acknowledgement.
struct Envelope {
  msg: Message,
  taken: Option<oneshot::Sender<()>>,
}

/// Creates a bounded queue and returns its two halves.
///
/// A capacity of zero makes a rendezvous queue. Capacities above
/// [`MAX_CAPACITY`] are clamped.
pub fn channel(label: impl Into<String>, capacity: usize) -> (Outlet, Inlet) {
  let label: Arc<str> = Arc::from(label.into());
  let capacity = capacity.min(MAX_CAPACITY);
  // A rendezvous offers one item at a time and waits for its hand-off.
  let (tx, rx) = mpsc::channel(capacity.max(1));
  trace!(channel = %label, capacity, "channel created");
  (
    Outlet {
      label: Arc::clone(&label),
      capacity,
      tx,
    },
    Inlet {
      label,
      rx: Arc::new(Mutex::new(rx)),
    },
  )
}

/// Sending half of a queue.
#[derive(Clone)]
pub struct Outlet {
  label: Arc<str>,
  capacity: usize,
  tx: mpsc::Sender<Envelope>,
}

impl Outlet {
  /// Sends one item, waiting for room in the queue. On a rendezvous queue it
  /// waits until a consumer has taken the item.
  ///
  /// # Errors
  ///
  /// - [`NodeError::Cancelled`] if `cancel` fires first.
  /// - [`NodeError::Disconnected`] if every inlet has been dropped.
  pub async fn send(&self, msg: Message, cancel: &CancellationToken) -> Result<(), NodeError> {
    if self.capacity > 0 {
      return self.offer(Envelope { msg, taken: None }, cancel).await;
    }
    let (taken_tx, taken_rx) = oneshot::channel();
    self
      .offer(
        Envelope {
          msg,
          taken: Some(taken_tx),
        },
        cancel,
      )
      .await?;
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(NodeError::Cancelled),
      taken = taken_rx => taken.map_err(|_| self.disconnected()),
    }
  }

  async fn offer(&self, envelope: Envelope, cancel: &CancellationToken) -> Result<(), NodeError> {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(NodeError::Cancelled),
      sent = self.tx.send(envelope) => sent.map_err(|_| self.disconnected()),
    }
  }

  fn disconnected(&self) -> NodeError {
    NodeError::Disconnected {
      port: self.label.to_string(),
    }
  }

  /// The `node.port` label this queue was created for.
  pub fn label(&self) -> &str {
    &self.label
  }

  /// Maximum number of items the queue buffers; zero for a rendezvous.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Returns `true` once every inlet of the queue has been dropped.
  pub fn is_disconnected(&self) -> bool {
    self.tx.is_closed()
  }

  /// Returns `true` if both outlets feed the same queue.
  pub fn same_channel(&self, other: &Outlet) -> bool {
    self.tx.same_channel(&other.tx)
  }
}

impl fmt::Debug for Outlet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Outlet")
      .field("label", &self.label)
      .field("capacity", &self.capacity())
      .finish()
  }
}

/// Receiving half of a queue. Clones share, and compete for, the same items.
#[derive(Clone)]
pub struct Inlet {
  label: Arc<str>,
  rx: Arc<Mutex<mpsc::Receiver<Envelope>>>,
}

impl Inlet {
  /// Receives the next item.
  ///
  /// Returns `Ok(None)` once the producer has closed the queue and it has been
  /// drained.
  ///
  /// # Errors
  ///
  /// [`NodeError::Cancelled`] if `cancel` fires first.
  pub async fn recv(&self, cancel: &CancellationToken) -> Result<Option<Message>, NodeError> {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(NodeError::Cancelled),
      item = async { self.rx.lock().await.recv().await } => Ok(item.map(|envelope| {
        if let Some(taken) = envelope.taken {
          let _ = taken.send(());
        }
        envelope.msg
      })),
    }
  }

  /// The `node.port` label of the producing side.
  pub fn label(&self) -> &str {
    &self.label
  }

  /// Returns `true` if both inlets drain the same queue.
  pub fn same_channel(&self, other: &Inlet) -> bool {
    Arc::ptr_eq(&self.rx, &other.rx)
  }
}

impl fmt::Debug for Inlet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Inlet").field("label", &self.label).finish()
  }
}
