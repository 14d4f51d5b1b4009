use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::event::{Event, Outcome, SourceId};
use crate::runtime::conduit::EventSender;

/// Held by a forwarding task for its whole life. If the task goes away
/// without calling `waive` (aborted, or panicked outside the source), the
/// guard emits the source's terminal event so the aggregator's live-count
/// still reaches zero.
pub(crate) struct ForwarderDropGuard<T: Send + 'static> {
  source: SourceId,
  agg_tx: EventSender<T>,
  cancel: CancellationToken,
  stopped_normally: bool,
}

impl<T: Send + 'static> ForwarderDropGuard<T> {
  pub fn new(source: SourceId, agg_tx: EventSender<T>, cancel: CancellationToken) -> Self {
    Self {
      source,
      agg_tx,
      cancel,
      stopped_normally: false,
    }
  }

  pub fn waive(&mut self) {
    self.stopped_normally = true;
  }
}

impl<T: Send + 'static> Drop for ForwarderDropGuard<T> {
  fn drop(&mut self) {
    if self.stopped_normally {
      return;
    }
    debug!(
      source = %self.source,
      "Forwarder stopping abnormally (panicked or aborted). Emitting terminal event."
    );

    let event = Event::closed(self.source, Outcome::Cancelled);
    match self.agg_tx.try_send(event) {
      Ok(()) => {}
      Err(async_channel::TrySendError::Closed(_)) => {
        // Aggregator already gone; nobody is counting.
      }
      Err(async_channel::TrySendError::Full(event)) => {
        // Cannot block in drop. Hand the send to the runtime if one exists.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
          let agg_tx = self.agg_tx.clone();
          let cancel = self.cancel.clone();
          handle.spawn(async move {
            tokio::select! {
              _ = cancel.cancelled() => {}
              _ = agg_tx.send(event) => {}
            }
          });
        } else {
          tracing::warn!(source = %self.source, "No runtime available to deliver terminal event from drop");
        }
      }
    }
  }
}
