// flowbot/src/broadcast.rs

//! Multicast stream of lifecycle transitions.
//!
//! Every subscriber gets its own unbounded queue, so publishing never waits on
//! a slow reader. A subscriber whose receiving side is gone is pruned on the
//! next publish and never affects the publisher or the other subscribers.

use crate::core::state::StateTransition;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{event, Level};

struct Hub {
  next_id: AtomicU64,
  subscribers: RwLock<Vec<(u64, UnboundedSender<StateTransition>)>>,
}

impl Hub {
  fn remove(&self, id: u64) -> bool {
    let mut subs = self.subscribers.write();
    let before = subs.len();
    subs.retain(|(sub_id, _)| *sub_id != id);
    subs.len() != before
  }
}

/// Cheap to clone; clones publish to the same set of subscribers.
#[derive(Clone)]
pub struct StateBroadcaster {
  hub: Arc<Hub>,
}

impl StateBroadcaster {
  pub fn new() -> Self {
    Self {
      hub: Arc::new(Hub {
        next_id: AtomicU64::new(1),
        subscribers: RwLock::new(Vec::new()),
      }),
    }
  }

  /// Registers a new observer. It receives every event published from now on,
  /// in emission order, until it is released with [`Subscription::unsubscribe`].
  ///
  /// The queue is unbounded: events a live subscriber does not read are held
  /// in memory until it reads, drains or unsubscribes.
  pub fn subscribe(&self) -> Subscription {
    let id = self.hub.next_id.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = mpsc::unbounded_channel();
    self.hub.subscribers.write().push((id, tx));
    event!(Level::TRACE, subscription_id = id, "State stream subscriber added.");
    Subscription {
      id,
      receiver: rx,
      hub: Arc::downgrade(&self.hub),
    }
  }

  /// Releases `subscription`, returning events it had received but not read.
  pub fn unsubscribe(&self, subscription: Subscription) -> Vec<StateTransition> {
    subscription.unsubscribe()
  }

  /// Delivers `transition` to every current subscriber. Never blocks.
  pub fn publish(&self, transition: StateTransition) {
    let mut closed = Vec::new();
    {
      let subs = self.hub.subscribers.read();
      for (id, tx) in subs.iter() {
        if tx.send(transition.clone()).is_err() {
          closed.push(*id);
        }
      }
    }
    for id in closed {
      if self.hub.remove(id) {
        event!(
          Level::DEBUG,
          subscription_id = id,
          "Pruned state stream subscriber with a dropped receiver."
        );
      }
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self.hub.subscribers.read().len()
  }
}

impl Default for StateBroadcaster {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for StateBroadcaster {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StateBroadcaster")
      .field("subscribers", &self.subscriber_count())
      .finish()
  }
}

/// Receiving end of one observer.
pub struct Subscription {
  id: u64,
  receiver: UnboundedReceiver<StateTransition>,
  hub: Weak<Hub>,
}

impl Subscription {
  pub fn id(&self) -> u64 {
    self.id
  }

  /// Waits for the next event. `None` once the stream can deliver nothing more.
  pub async fn recv(&mut self) -> Option<StateTransition> {
    self.receiver.recv().await
  }

  /// Returns the next already-delivered event, if any.
  pub fn try_recv(&mut self) -> Option<StateTransition> {
    match self.receiver.try_recv() {
      Ok(t) => Some(t),
      Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
    }
  }

  /// Takes every already-delivered event.
  pub fn drain(&mut self) -> Vec<StateTransition> {
    let mut out = Vec::new();
    while let Some(t) = self.try_recv() {
      out.push(t);
    }
    out
  }

  /// Detaches from the broadcaster and returns the events not yet read.
  pub fn unsubscribe(mut self) -> Vec<StateTransition> {
    if let Some(hub) = self.hub.upgrade() {
      hub.remove(self.id);
    }
    self.receiver.close();
    event!(Level::TRACE, subscription_id = self.id, "State stream subscriber released.");
    self.drain()
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription").field("id", &self.id).finish()
  }
}
