// src/event.rs

//! The unit that flows through a fan-in: a payload tagged with the producer
//! that emitted it, or a terminal marker saying that producer is finished.

use std::fmt;
use std::io;
use std::sync::Arc;

/// Identifies which producer emitted an event.
///
/// Assigned in registration order starting at zero and stable for the
/// producer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl SourceId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<usize> for SourceId {
  fn from(value: usize) -> Self {
    SourceId(value)
  }
}

/// An I/O failure carried on a terminal event.
///
/// Cloneable so the same fault can sit in the event handed to the consumer
/// and in the aggregator's summary.
#[derive(Debug, Clone)]
pub struct StreamFault {
  inner: Arc<io::Error>,
}

impl StreamFault {
  pub fn new(error: io::Error) -> Self {
    Self { inner: Arc::new(error) }
  }

  pub fn kind(&self) -> io::ErrorKind {
    self.inner.kind()
  }

  pub fn io_error(&self) -> &io::Error {
    &self.inner
  }
}

impl fmt::Display for StreamFault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&*self.inner, f)
  }
}

impl std::error::Error for StreamFault {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&*self.inner)
  }
}

impl From<io::Error> for StreamFault {
  fn from(error: io::Error) -> Self {
    StreamFault::new(error)
  }
}

/// How a producer's stream ended.
#[derive(Debug, Clone)]
pub enum Outcome {
  /// The producer closed its conduit or its stream reached end-of-stream.
  Finished,
  /// Reading failed with something other than end-of-stream, or the source
  /// panicked.
  Failed(StreamFault),
  /// The forwarding task was unwound by cancellation or exited abnormally.
  Cancelled,
}

impl Outcome {
  pub fn is_clean(&self) -> bool {
    matches!(self, Outcome::Finished)
  }

  pub fn fault(&self) -> Option<&StreamFault> {
    match self {
      Outcome::Failed(fault) => Some(fault),
      _ => None,
    }
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::Finished => write!(f, "finished"),
      Outcome::Failed(fault) => write!(f, "failed: {}", fault),
      Outcome::Cancelled => write!(f, "cancelled"),
    }
  }
}

/// An event observed at the aggregation point.
///
/// A source emits any number of `Item`s followed by exactly one `Closed`.
/// The terminal event carries no payload.
#[derive(Debug, Clone)]
pub enum Event<T> {
  Item { source: SourceId, payload: T },
  Closed { source: SourceId, outcome: Outcome },
}

impl<T> Event<T> {
  pub fn item(source: SourceId, payload: T) -> Self {
    Event::Item { source, payload }
  }

  pub fn closed(source: SourceId, outcome: Outcome) -> Self {
    Event::Closed { source, outcome }
  }

  pub fn source_id(&self) -> SourceId {
    match self {
      Event::Item { source, .. } | Event::Closed { source, .. } => *source,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Event::Closed { .. })
  }

  pub fn payload(&self) -> Option<&T> {
    match self {
      Event::Item { payload, .. } => Some(payload),
      Event::Closed { .. } => None,
    }
  }

  pub fn into_payload(self) -> Option<T> {
    match self {
      Event::Item { payload, .. } => Some(payload),
      Event::Closed { .. } => None,
    }
  }

  pub fn outcome(&self) -> Option<&Outcome> {
    match self {
      Event::Closed { outcome, .. } => Some(outcome),
      Event::Item { .. } => None,
    }
  }
}
