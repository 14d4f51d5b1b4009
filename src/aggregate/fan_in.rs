// src/aggregate/fan_in.rs

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::aggregate::aggregator::Aggregator;
use crate::aggregate::forwarder::run_forwarder;
use crate::aggregate::source::{ChannelSource, ReaderSource, Source, StreamSource};
use crate::error::TributaryError;
use crate::event::SourceId;
use crate::options::AggregateOptions;
use crate::runtime::{conduit, ConduitReceiver, ConduitSender, EventReceiver, EventSender, WaitGroup};

/// Builder for a fan-in: register every producer, then `start` to get the
/// single `Aggregator` that consumes them.
///
/// Registration spawns the producer's forwarding task right away, so it must
/// happen inside a Tokio runtime. Forwarders block on the aggregate conduit
/// until the aggregator starts reading.
///
/// Dropping a `FanIn` without starting it cancels its forwarders.
pub struct FanIn<T> {
  options: AggregateOptions,
  agg_tx: EventSender<T>,
  agg_rx: EventReceiver<T>,
  next_source: usize,
  cancel: CancellationToken,
  cancel_on_drop: DropGuard,
  forwarders: WaitGroup,
}

impl<T: Send + 'static> FanIn<T> {
  pub fn new(options: AggregateOptions) -> Result<Self, TributaryError> {
    Self::with_cancellation(options, CancellationToken::new())
  }

  /// Like `new`, but the aggregation is also cancelled when `cancel` is.
  /// The fan-in works on a child token so cancelling it never affects the
  /// caller's token.
  pub fn with_cancellation(options: AggregateOptions, cancel: CancellationToken) -> Result<Self, TributaryError> {
    options.validate()?;
    let (agg_tx, agg_rx) = conduit(options.capacity);
    let cancel = cancel.child_token();
    Ok(Self {
      options,
      agg_tx,
      agg_rx,
      next_source: 0,
      cancel_on_drop: cancel.clone().drop_guard(),
      cancel,
      forwarders: WaitGroup::new(),
    })
  }

  /// Creates `producers` private conduits, starts aggregation over them and
  /// returns the sending halves in source order.
  pub fn with_producers(
    producers: usize,
    options: AggregateOptions,
  ) -> Result<(Vec<Producer<T>>, Aggregator<T>), TributaryError> {
    let mut fan_in = Self::new(options)?;
    let handles = (0..producers).map(|_| fan_in.producer()).collect();
    Ok((handles, fan_in.start()))
  }

  /// Registers a new producer backed by a private conduit of
  /// `source_capacity` and returns its sending half.
  pub fn producer(&mut self) -> Producer<T> {
    let (tx, rx) = conduit(self.options.source_capacity);
    let source_id = self.attach_receiver(rx);
    Producer {
      source_id,
      tx,
      cancel: self.cancel.clone(),
    }
  }

  /// Forwards an existing conduit. The source closes when all of its senders
  /// are dropped or it is closed explicitly.
  pub fn attach_receiver(&mut self, rx: ConduitReceiver<T>) -> SourceId {
    self.attach(ChannelSource::new(rx))
  }

  /// Forwards a stream until it yields `None`.
  pub fn attach_stream<S>(&mut self, stream: S) -> SourceId
  where
    S: Stream<Item = T> + Send + Unpin + 'static,
  {
    self.attach(StreamSource::new(stream))
  }

  /// Registers any `Source` and spawns its forwarding task.
  pub fn attach<S>(&mut self, source: S) -> SourceId
  where
    S: Source<T> + 'static,
  {
    let source_id = SourceId(self.next_source);
    self.next_source += 1;

    let wg_guard = self.forwarders.enter();
    tokio::spawn(run_forwarder(
      wg_guard,
      source_id,
      source,
      self.agg_tx.clone(),
      self.cancel.clone(),
    ));
    debug!(source = %source_id, "Producer registered");
    source_id
  }

  /// Number of producers registered so far.
  pub fn producer_count(&self) -> usize {
    self.next_source
  }

  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Fixes the producer set and returns the aggregator. With no producers
  /// the aggregator is immediately done.
  pub fn start(self) -> Aggregator<T> {
    let FanIn {
      agg_tx,
      agg_rx,
      next_source,
      cancel,
      cancel_on_drop,
      forwarders,
      ..
    } = self;
    let _ = cancel_on_drop.disarm();
    // Only forwarders may hold senders from here on, so the conduit closes
    // once they are all gone.
    drop(agg_tx);
    Aggregator::new(agg_rx, next_source, cancel, forwarders)
  }
}

impl FanIn<Bytes> {
  /// Forwards a byte stream in chunks of at most `chunk_size` bytes.
  pub fn attach_reader<R>(&mut self, reader: R, chunk_size: usize) -> SourceId
  where
    R: AsyncRead + Send + Unpin + 'static,
  {
    self.attach(ReaderSource::new(reader, chunk_size))
  }
}

/// Sending half of a producer's private conduit. Cloneable; the producer is
/// closed once every clone is dropped or `close` is called.
#[derive(Debug)]
pub struct Producer<T> {
  source_id: SourceId,
  tx: ConduitSender<T>,
  cancel: CancellationToken,
}

impl<T> Clone for Producer<T> {
  fn clone(&self) -> Self {
    Self {
      source_id: self.source_id,
      tx: self.tx.clone(),
      cancel: self.cancel.clone(),
    }
  }
}

impl<T> Producer<T> {
  pub fn source_id(&self) -> SourceId {
    self.source_id
  }

  /// Sends one item, waiting while the private conduit is full.
  pub async fn send(&self, item: T) -> Result<(), TributaryError> {
    self.tx.send(item).await.map_err(|_| self.closed_error())
  }

  /// Signals that this producer will send nothing more.
  pub fn close(&self) {
    self.tx.close();
  }

  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }

  fn closed_error(&self) -> TributaryError {
    if self.cancel.is_cancelled() {
      TributaryError::Cancelled
    } else {
      TributaryError::QueueClosed
    }
  }
}
