use std::io;
use thiserror::Error;

use crate::event::{SourceId, StreamFault};

/// Boxed error returned by work-queue handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum TributaryError {
  #[error("Invalid argument provided: {0}")]
  InvalidArgument(String),

  // --- Lifecycle ---
  #[error("Operation is invalid in the current state: {0}")]
  InvalidState(&'static str),
  #[error("Queue is closed; no further items are accepted")]
  QueueClosed,
  #[error("Operation cancelled")]
  Cancelled,

  // --- Producer / Worker Faults ---
  /// A producer's stream failed with something other than end-of-stream.
  #[error("Read failure on source {source_id}: {fault}")]
  ReadFailure { source_id: SourceId, fault: StreamFault },
  /// A worker's handler returned an error or panicked.
  #[error("Worker {worker_id} failed: {message}")]
  WorkerFault { worker_id: usize, message: String },

  /// Setup outside the core failed (pipe creation, spawn). The core never started.
  #[error("Setup failed: {0}")]
  SetupFailure(String),

  // --- Internal Errors ---
  #[error("Internal library error: {0}")]
  Internal(String),
}

impl TributaryError {
  /// Maps a setup-time `io::Error` (e.g. spawning a child) into `SetupFailure`,
  /// keeping the original message.
  pub fn from_io_setup(e: io::Error, what: &str) -> Self {
    match e.kind() {
      io::ErrorKind::NotFound => TributaryError::SetupFailure(format!("{}: not found", what)),
      io::ErrorKind::PermissionDenied => TributaryError::SetupFailure(format!("{}: permission denied", what)),
      _ => TributaryError::SetupFailure(format!("{}: {}", what, e)),
    }
  }

  /// True for errors that only mean "the other side went away".
  pub fn is_closed(&self) -> bool {
    matches!(self, TributaryError::QueueClosed | TributaryError::Cancelled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn setup_errors_name_the_failing_step() {
    let err = TributaryError::from_io_setup(io::Error::new(io::ErrorKind::NotFound, "x"), "nosuchcmd");
    assert!(matches!(&err, TributaryError::SetupFailure(msg) if msg == "nosuchcmd: not found"));
    assert!(!err.is_closed());
  }

  #[test]
  fn closed_and_cancelled_count_as_closed() {
    assert!(TributaryError::QueueClosed.is_closed());
    assert!(TributaryError::Cancelled.is_closed());
    assert!(!TributaryError::InvalidState("x").is_closed());
  }
}
