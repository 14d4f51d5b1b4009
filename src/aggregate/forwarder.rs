// src/aggregate/forwarder.rs

use std::io;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::aggregate::source::Source;
use crate::event::{Event, Outcome, SourceId, StreamFault};
use crate::runtime::{panic_message, EventSender, ForwarderDropGuard, WaitGroupGuard};

/// Lifecycle of one forwarding task. `Exited` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwarderState {
  Open,
  SourceClosed,
  Exited,
}

/// Why a forwarder stopped before delivering its terminal event.
enum Unwind {
  Cancelled,
  AggregatorGone,
}

/// Relays every item from `source` into the aggregate conduit tagged with
/// `source_id`, then sends exactly one terminal event.
///
/// Every blocking point also watches `cancel`, so an abandoned forwarder
/// exits instead of waiting on a producer or an aggregator that will never
/// move again.
///
/// A panic inside `source` closes the source with `Outcome::Failed`, carrying
/// the panic message as the fault.
///
/// `_wg_guard` comes first so it is dropped last: the forwarder only counts as
/// exited once `source` (and with it the producer's conduit) is gone.
pub(crate) async fn run_forwarder<T, S>(
  _wg_guard: WaitGroupGuard,
  source_id: SourceId,
  mut source: S,
  agg_tx: EventSender<T>,
  cancel: CancellationToken,
) where
  T: Send + 'static,
  S: Source<T>,
{
  let mut guard = ForwarderDropGuard::new(source_id, agg_tx.clone(), cancel.clone());
  let mut state = ForwarderState::Open;
  let mut forwarded: u64 = 0;
  debug!(source = %source_id, ?state, "Forwarder started");

  let outcome = loop {
    let next = tokio::select! {
      biased;
      _ = cancel.cancelled() => None,
      next = AssertUnwindSafe(source.next_item()).catch_unwind() => Some(next),
    };
    let Some(next) = next else {
      exit_early(source_id, &mut guard, Unwind::Cancelled, forwarded);
      return;
    };

    match next {
      Ok(Ok(Some(payload))) => {
        if let Err(unwind) = send_event(&agg_tx, &cancel, Event::item(source_id, payload)).await {
          exit_early(source_id, &mut guard, unwind, forwarded);
          return;
        }
        forwarded += 1;
        trace!(source = %source_id, forwarded, "Forwarded item");
      }
      Ok(Ok(None)) => break Outcome::Finished,
      Ok(Err(e)) => {
        warn!(source = %source_id, error = %e, "Read failed; closing source");
        break Outcome::Failed(StreamFault::new(e));
      }
      Err(panic) => {
        let message = panic_message(panic.as_ref());
        warn!(source = %source_id, %message, "Source panicked; closing source");
        break Outcome::Failed(StreamFault::new(io::Error::new(
          io::ErrorKind::Other,
          format!("source panicked: {}", message),
        )));
      }
    }
  };

  state = ForwarderState::SourceClosed;
  trace!(source = %source_id, ?state, %outcome, "Source closed, sending terminal event");
  if let Err(unwind) = send_event(&agg_tx, &cancel, Event::closed(source_id, outcome)).await {
    exit_early(source_id, &mut guard, unwind, forwarded);
    return;
  }

  guard.waive();
  state = ForwarderState::Exited;
  debug!(source = %source_id, ?state, forwarded, "Forwarder finished");
}

async fn send_event<T>(agg_tx: &EventSender<T>, cancel: &CancellationToken, event: Event<T>) -> Result<(), Unwind> {
  let sent = tokio::select! {
    biased;
    _ = cancel.cancelled() => return Err(Unwind::Cancelled),
    res = agg_tx.send(event) => res,
  };
  sent.map_err(|_| Unwind::AggregatorGone)
}

fn exit_early<T: Send + 'static>(source_id: SourceId, guard: &mut ForwarderDropGuard<T>, unwind: Unwind, forwarded: u64) {
  // Nobody is waiting for a terminal event once the aggregator is cancelled or dropped.
  guard.waive();
  match unwind {
    Unwind::Cancelled => debug!(source = %source_id, forwarded, "Forwarder cancelled"),
    Unwind::AggregatorGone => debug!(source = %source_id, forwarded, "Aggregate conduit closed; forwarder exiting"),
  }
}
