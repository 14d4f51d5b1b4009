// src/capture.rs

//! Concurrent capture of a child process's standard output and standard
//! error.
//!
//! Both streams are fan-in producers over byte chunks: stdout is source 0,
//! stderr is source 1. Spawning the process, and waiting for its exit
//! status, stay with the caller. Only the two readers are handed in.

use std::fmt;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use crate::aggregate::{AggregateSummary, Aggregator, FanIn};
use crate::error::TributaryError;
use crate::event::{Event, SourceId};
use crate::options::CaptureOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
  Stdout,
  Stderr,
}

impl StreamKind {
  pub fn source_id(self) -> SourceId {
    match self {
      StreamKind::Stdout => SourceId(0),
      StreamKind::Stderr => SourceId(1),
    }
  }

  pub fn from_source(source: SourceId) -> Option<Self> {
    match source.index() {
      0 => Some(StreamKind::Stdout),
      1 => Some(StreamKind::Stderr),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      StreamKind::Stdout => "stdout",
      StreamKind::Stderr => "stderr",
    }
  }
}

impl fmt::Display for StreamKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Starts forwarding `stdout` and `stderr` and returns the aggregator over
/// both. Must be called inside a Tokio runtime.
pub fn capture<O, E>(stdout: O, stderr: E, options: &CaptureOptions) -> Result<Aggregator<Bytes>, TributaryError>
where
  O: AsyncRead + Send + Unpin + 'static,
  E: AsyncRead + Send + Unpin + 'static,
{
  options.validate()?;
  let mut fan_in = FanIn::<Bytes>::new(options.aggregate.clone())?;
  let out_id = fan_in.attach_reader(stdout, options.chunk_size);
  let err_id = fan_in.attach_reader(stderr, options.chunk_size);
  debug_assert_eq!(out_id, StreamKind::Stdout.source_id());
  debug_assert_eq!(err_id, StreamKind::Stderr.source_id());
  Ok(fan_in.start())
}

/// Everything read from both streams, plus the aggregator's summary.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
  pub stdout: Bytes,
  pub stderr: Bytes,
  pub summary: AggregateSummary,
}

/// Drives `aggregator` to completion, calling `on_event` once per event in
/// arrival order and accumulating each stream's bytes.
///
/// A read failure on either stream is returned as `ReadFailure` after both
/// streams have closed.
pub async fn collect<F>(mut aggregator: Aggregator<Bytes>, mut on_event: F) -> Result<CapturedOutput, TributaryError>
where
  F: FnMut(StreamKind, &Event<Bytes>),
{
  let mut stdout = BytesMut::new();
  let mut stderr = BytesMut::new();

  while let Some(event) = aggregator.next_event().await {
    let Some(kind) = StreamKind::from_source(event.source_id()) else {
      return Err(TributaryError::Internal(format!(
        "unexpected source {} in process capture",
        event.source_id()
      )));
    };
    on_event(kind, &event);
    if let Some(chunk) = event.payload() {
      match kind {
        StreamKind::Stdout => stdout.extend_from_slice(chunk),
        StreamKind::Stderr => stderr.extend_from_slice(chunk),
      }
    }
  }

  let summary = aggregator.finish().await?;
  Ok(CapturedOutput {
    stdout: stdout.freeze(),
    stderr: stderr.freeze(),
    summary,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::Outcome;
  use std::io;
  use std::pin::Pin;
  use std::task::{Context, Poll};
  use tokio::io::ReadBuf;

  /// Yields `prefix` and then fails.
  struct FailingReader {
    prefix: Option<Vec<u8>>,
  }

  impl AsyncRead for FailingReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
      match self.prefix.take() {
        Some(prefix) => {
          buf.put_slice(&prefix);
          Poll::Ready(Ok(()))
        }
        None => Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream reset"))),
      }
    }
  }

  #[tokio::test]
  async fn collects_both_streams_by_source() {
    let agg = capture(&b"hello out"[..], &b"oops"[..], &CaptureOptions::default()).unwrap();
    let mut terminals = Vec::new();
    let output = collect(agg, |kind, ev| {
      if ev.is_terminal() {
        terminals.push(kind);
      }
    })
    .await
    .unwrap();

    assert_eq!(&output.stdout[..], b"hello out");
    assert_eq!(&output.stderr[..], b"oops");
    terminals.sort_by_key(|k| k.source_id());
    assert_eq!(terminals, vec![StreamKind::Stdout, StreamKind::Stderr]);
    assert_eq!(output.summary.closed_sources(), 2);
  }

  #[tokio::test]
  async fn read_error_closes_source_and_is_surfaced() {
    let reader = FailingReader {
      prefix: Some(b"partial".to_vec()),
    };
    let mut agg = capture(reader, &b""[..], &CaptureOptions::default()).unwrap();

    let mut stdout_outcome = None;
    while let Some(ev) = agg.next_event().await {
      if let Event::Closed {
        source,
        outcome,
      } = &ev
      {
        if *source == StreamKind::Stdout.source_id() {
          stdout_outcome = Some(outcome.clone());
        }
      }
    }
    match stdout_outcome {
      Some(Outcome::Failed(fault)) => assert_eq!(fault.kind(), io::ErrorKind::ConnectionReset),
      other => panic!("expected failed outcome, got {:?}", other),
    }
    assert_eq!(agg.summary().items[0], 1);

    match agg.finish().await {
      Err(TributaryError::ReadFailure { source_id, .. }) => assert_eq!(source_id, SourceId(0)),
      other => panic!("expected ReadFailure, got {:?}", other),
    }
  }

  #[test]
  fn stream_kind_maps_to_fixed_sources() {
    assert_eq!(StreamKind::from_source(SourceId(0)), Some(StreamKind::Stdout));
    assert_eq!(StreamKind::from_source(SourceId(1)), Some(StreamKind::Stderr));
    assert_eq!(StreamKind::from_source(SourceId(2)), None);
    assert_eq!(StreamKind::Stderr.to_string(), "stderr");
  }
}
