// src/runtime/conduit.rs

//! Type aliases for the blocking queues that connect producers, forwarding
//! tasks, workers and the aggregator. Backed by `async-channel`.

use crate::event::Event;

/// The sending end of a conduit. Cloneable; the conduit closes when every
/// sender has been dropped (or `close()` is called explicitly).
pub type ConduitSender<T> = async_channel::Sender<T>;

/// The receiving end of a conduit. Cloneable; each item goes to exactly one
/// receiver.
pub type ConduitReceiver<T> = async_channel::Receiver<T>;

/// Sending end of the shared aggregate conduit.
pub type EventSender<T> = ConduitSender<Event<T>>;

/// Receiving end of the shared aggregate conduit.
pub type EventReceiver<T> = ConduitReceiver<Event<T>>;

/// Creates a bounded conduit pair.
///
/// `async-channel` has no zero-capacity rendezvous mode, so a capacity of
/// zero is raised to one: a sender then blocks until the single in-flight
/// item has been taken.
pub fn conduit<T>(capacity: usize) -> (ConduitSender<T>, ConduitReceiver<T>) {
  async_channel::bounded(capacity.max(1))
}
