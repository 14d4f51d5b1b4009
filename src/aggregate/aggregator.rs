// src/aggregate/aggregator.rs

use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::TributaryError;
use crate::event::{Event, Outcome, SourceId, StreamFault};
use crate::runtime::{EventReceiver, WaitGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregatorState {
  Collecting,
  Done,
}

/// What the aggregator saw, available at any time and final once done.
#[derive(Debug, Clone, Default)]
pub struct AggregateSummary {
  /// Number of producers registered when aggregation started.
  pub producers: usize,
  /// Non-terminal events received, indexed by source.
  pub items: Vec<u64>,
  /// Terminal outcome per source; `None` until that source closes.
  pub outcomes: Vec<Option<Outcome>>,
  /// Aggregation ended through cancellation rather than every source closing.
  pub cancelled: bool,
}

impl AggregateSummary {
  fn new(producers: usize) -> Self {
    Self {
      producers,
      items: vec![0; producers],
      outcomes: vec![None; producers],
      cancelled: false,
    }
  }

  pub fn total_items(&self) -> u64 {
    self.items.iter().sum()
  }

  pub fn closed_sources(&self) -> usize {
    self.outcomes.iter().filter(|o| o.is_some()).count()
  }

  /// Sources that ended with a read failure, in source order.
  pub fn faults(&self) -> impl Iterator<Item = (SourceId, &StreamFault)> {
    self
      .outcomes
      .iter()
      .enumerate()
      .filter_map(|(idx, outcome)| outcome.as_ref().and_then(Outcome::fault).map(|f| (SourceId(idx), f)))
  }

  /// `Err` with the first carried read failure, or `Cancelled` if the
  /// aggregation was cut short; otherwise the summary itself.
  pub fn into_result(self) -> Result<Self, TributaryError> {
    if let Some((source_id, fault)) = self.faults().next() {
      return Err(TributaryError::ReadFailure {
        source_id,
        fault: fault.clone(),
      });
    }
    if self.cancelled {
      return Err(TributaryError::Cancelled);
    }
    Ok(self)
  }
}

/// The single consumer of a fan-in.
///
/// Owns the live-count: it starts at the number of registered producers and
/// drops by one per first terminal event from each source. Once it is zero
/// the aggregate conduit is closed and every later `next_event` returns
/// `None`.
pub struct Aggregator<T> {
  rx: EventReceiver<T>,
  live: usize,
  state: AggregatorState,
  summary: AggregateSummary,
  cancel: CancellationToken,
  forwarders: WaitGroup,
}

impl<T: Send + 'static> Aggregator<T> {
  pub(crate) fn new(rx: EventReceiver<T>, producers: usize, cancel: CancellationToken, forwarders: WaitGroup) -> Self {
    debug!(producers, "Aggregation started");
    Self {
      rx,
      live: producers,
      state: AggregatorState::Collecting,
      summary: AggregateSummary::new(producers),
      cancel,
      forwarders,
    }
  }

  /// Receives the next event, or `None` once every producer has closed or
  /// the aggregation was cancelled. `None` is sticky.
  pub async fn next_event(&mut self) -> Option<Event<T>> {
    loop {
      if self.state == AggregatorState::Done {
        return None;
      }
      if self.live == 0 {
        self.finish_collecting(false);
        return None;
      }

      let received = tokio::select! {
        biased;
        _ = self.cancel.cancelled() => None,
        ev = self.rx.recv() => Some(ev),
      };

      let event = match received {
        None => {
          debug!(live = self.live, "Aggregation cancelled");
          self.finish_collecting(true);
          return None;
        }
        Some(Err(_)) => {
          // Every forwarder and drop guard is gone without a terminal event
          // for the remaining sources. Nothing more can arrive.
          warn!(live = self.live, "Aggregate conduit closed with producers still live");
          self.finish_collecting(true);
          return None;
        }
        Some(Ok(event)) => event,
      };

      if self.accept(&event) {
        return Some(event);
      }
    }
  }

  /// Updates counters for `event`. Returns false for events that must not
  /// reach the consumer (anything after a source's terminal event).
  fn accept(&mut self, event: &Event<T>) -> bool {
    let idx = event.source_id().index();
    if idx >= self.summary.producers {
      warn!(source = idx, "Event from unregistered source dropped");
      return false;
    }
    if self.summary.outcomes[idx].is_some() {
      warn!(source = idx, terminal = event.is_terminal(), "Event after terminal event dropped");
      return false;
    }

    match event {
      Event::Item { .. } => {
        self.summary.items[idx] += 1;
        trace!(source = idx, "Item received");
      }
      Event::Closed { outcome, .. } => {
        self.summary.outcomes[idx] = Some(outcome.clone());
        self.live -= 1;
        debug!(source = idx, %outcome, live = self.live, "Source closed");
        if self.live == 0 {
          self.rx.close();
        }
      }
    }
    true
  }

  fn finish_collecting(&mut self, cancelled: bool) {
    self.state = AggregatorState::Done;
    self.summary.cancelled = cancelled;
    self.rx.close();
    if cancelled {
      // Unblocks forwarders still waiting on a producer.
      self.cancel.cancel();
    }
    debug!(
      cancelled,
      items = self.summary.total_items(),
      closed = self.summary.closed_sources(),
      "Aggregation done"
    );
  }

  /// Number of producers that have not emitted a terminal event yet.
  pub fn live_count(&self) -> usize {
    self.live
  }

  pub fn is_done(&self) -> bool {
    self.state == AggregatorState::Done
  }

  pub fn summary(&self) -> &AggregateSummary {
    &self.summary
  }

  /// Token observed by this aggregator and all of its forwarding tasks.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Stops aggregation early. The next `next_event` returns `None` and every
  /// forwarding task unwinds.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  /// Cancels and waits until every forwarding task has exited.
  pub async fn shutdown(&mut self) {
    if self.state != AggregatorState::Done {
      self.finish_collecting(true);
    }
    self.cancel.cancel();
    self.forwarders.wait().await;
    debug!("All forwarders exited");
  }

  /// Drains remaining events (discarding them), waits for the forwarders,
  /// and surfaces any carried read failure.
  pub async fn finish(mut self) -> Result<AggregateSummary, TributaryError> {
    while self.next_event().await.is_some() {}
    self.forwarders.wait().await;
    self.summary.clone().into_result()
  }

  /// Turns the aggregator into a stream of events ending at `Done`.
  pub fn into_stream(self) -> impl Stream<Item = Event<T>> + Send {
    futures::stream::unfold(self, |mut agg| async move {
      let event = agg.next_event().await?;
      Some((event, agg))
    })
  }
}

impl<T> Drop for Aggregator<T> {
  fn drop(&mut self) {
    // Abandoned forwarders must observe this and exit.
    self.cancel.cancel();
    self.rx.close();
  }
}
