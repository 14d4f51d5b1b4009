// src/aggregate/source.rs

//! Producers as seen by a forwarding task: something that yields items until
//! it is exhausted, or fails.

use std::io;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::runtime::ConduitReceiver;

/// A producer's private conduit, from the forwarding task's side.
///
/// `Ok(None)` means the producer has closed (end-of-stream). An `Err` is a
/// read failure; the forwarder stops reading and carries the error on the
/// source's terminal event.
#[async_trait::async_trait]
pub trait Source<T: Send>: Send {
  async fn next_item(&mut self) -> io::Result<Option<T>>;
}

/// Reads from a conduit until every sender is gone.
pub struct ChannelSource<T> {
  rx: ConduitReceiver<T>,
}

impl<T> ChannelSource<T> {
  pub fn new(rx: ConduitReceiver<T>) -> Self {
    Self { rx }
  }
}

#[async_trait::async_trait]
impl<T: Send> Source<T> for ChannelSource<T> {
  async fn next_item(&mut self) -> io::Result<Option<T>> {
    // RecvError only means closed and empty.
    Ok(self.rx.recv().await.ok())
  }
}

/// Forwards any `Stream` until it returns `None`.
pub struct StreamSource<S> {
  stream: S,
}

impl<S> StreamSource<S> {
  pub fn new(stream: S) -> Self {
    Self { stream }
  }
}

#[async_trait::async_trait]
impl<S> Source<S::Item> for StreamSource<S>
where
  S: Stream + Send + Unpin,
  S::Item: Send,
{
  async fn next_item(&mut self) -> io::Result<Option<S::Item>> {
    Ok(self.stream.next().await)
  }
}

/// Reads a byte stream in chunks of at most `chunk_size` bytes.
///
/// Chunk boundaries follow whatever the reader returns and carry no meaning.
/// `Interrupted` reads are retried.
pub struct ReaderSource<R> {
  reader: R,
  buf: BytesMut,
  chunk_size: usize,
}

impl<R> ReaderSource<R> {
  pub fn new(reader: R, chunk_size: usize) -> Self {
    let chunk_size = chunk_size.max(1);
    Self {
      reader,
      buf: BytesMut::with_capacity(chunk_size),
      chunk_size,
    }
  }
}

#[async_trait::async_trait]
impl<R> Source<Bytes> for ReaderSource<R>
where
  R: AsyncRead + Send + Unpin,
{
  async fn next_item(&mut self) -> io::Result<Option<Bytes>> {
    loop {
      self.buf.resize(self.chunk_size, 0);
      match self.reader.read(&mut self.buf[..]).await {
        Ok(0) => return Ok(None),
        Ok(n) => return Ok(Some(self.buf.split_to(n).freeze())),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => {
          tracing::trace!("Read interrupted, retrying");
          continue;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::aggregate::FanIn;
  use crate::event::{Event, Outcome};
  use crate::options::AggregateOptions;
  use std::pin::Pin;
  use std::task::{Context, Poll};
  use tokio::io::ReadBuf;

  /// Fails with `Interrupted` on the first read, then serves `data`.
  struct InterruptedOnce {
    interrupted: bool,
    data: &'static [u8],
  }

  impl AsyncRead for InterruptedOnce {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
      if !self.interrupted {
        self.interrupted = true;
        return Poll::Ready(Err(io::Error::new(io::ErrorKind::Interrupted, "signal")));
      }
      let data = self.data;
      let n = data.len().min(buf.remaining());
      buf.put_slice(&data[..n]);
      self.data = &data[n..];
      Poll::Ready(Ok(()))
    }
  }

  #[tokio::test]
  async fn reader_source_retries_interrupted_reads() {
    let reader = InterruptedOnce {
      interrupted: false,
      data: b"abc",
    };
    let mut src = ReaderSource::new(reader, 16);
    assert_eq!(src.next_item().await.unwrap(), Some(Bytes::from_static(b"abc")));
    assert_eq!(src.next_item().await.unwrap(), None);
  }

  #[tokio::test]
  async fn interrupted_read_still_finishes_cleanly() {
    let mut fan_in = FanIn::<Bytes>::new(AggregateOptions::default()).unwrap();
    let id = fan_in.attach_reader(
      InterruptedOnce {
        interrupted: false,
        data: b"abc",
      },
      16,
    );
    let mut agg = fan_in.start();

    let mut collected = BytesMut::new();
    let mut outcome = None;
    while let Some(event) = agg.next_event().await {
      match event {
        Event::Item { payload, .. } => collected.extend_from_slice(&payload),
        Event::Closed { source, outcome: o } => {
          assert_eq!(source, id);
          outcome = Some(o);
        }
      }
    }
    assert_eq!(&collected[..], b"abc");
    assert!(matches!(outcome, Some(Outcome::Finished)), "outcome was {:?}", outcome);
    assert!(agg.finish().await.is_ok());
  }

  #[tokio::test]
  async fn reader_source_respects_chunk_size() {
    let data = vec![7u8; 25];
    let mut src = ReaderSource::new(&data[..], 10);
    let mut sizes = Vec::new();
    while let Some(chunk) = src.next_item().await.unwrap() {
      assert!(chunk.iter().all(|b| *b == 7));
      sizes.push(chunk.len());
    }
    assert_eq!(sizes, vec![10, 10, 5]);
  }

  #[tokio::test]
  async fn channel_source_ends_when_senders_drop() {
    let (tx, rx) = crate::runtime::conduit::<u32>(4);
    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();
    drop(tx);
    let mut src = ChannelSource::new(rx);
    assert_eq!(src.next_item().await.unwrap(), Some(1));
    assert_eq!(src.next_item().await.unwrap(), Some(2));
    assert_eq!(src.next_item().await.unwrap(), None);
  }
}
