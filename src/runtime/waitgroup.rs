// src/runtime/waitgroup.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// An asynchronous WaitGroup, similar to Go's `sync.WaitGroup`.
///
/// Tasks register with `add` and signal completion with `done` (or by
/// dropping the guard returned from `enter`). `wait` resolves once the
/// counter is back at zero.
#[derive(Debug, Clone)]
pub struct WaitGroup {
  count: Arc<AtomicUsize>,
  notify_on_zero: Arc<Notify>,
}

impl WaitGroup {
  /// Creates a new WaitGroup with an initial count of zero.
  pub fn new() -> Self {
    Self {
      count: Arc::new(AtomicUsize::new(0)),
      notify_on_zero: Arc::new(Notify::new()),
    }
  }

  /// Adds a delta to the WaitGroup counter.
  pub fn add(&self, delta: usize) {
    if delta == 0 {
      return;
    }
    let old_count = self.count.fetch_add(delta, Ordering::Relaxed);
    if old_count == 0 {
      tracing::trace!(delta, "WaitGroup count increased from zero");
    }
  }

  /// Registers one task and returns a guard that calls `done` when dropped,
  /// including when the task unwinds from a panic.
  pub fn enter(&self) -> WaitGroupGuard {
    self.add(1);
    WaitGroupGuard { wg: self.clone() }
  }

  /// Decrements the WaitGroup counter by one.
  ///
  /// Panics if the counter would drop below zero.
  pub fn done(&self) {
    // AcqRel: work done before done() is visible to whoever wait() releases.
    let old_count = self.count.fetch_sub(1, Ordering::AcqRel);

    if old_count == 0 {
      self.count.fetch_add(1, Ordering::Relaxed);
      panic!("WaitGroup::done() called when count was already zero!");
    } else if old_count == 1 {
      self.notify_on_zero.notify_waiters();
      tracing::trace!("WaitGroup count reached zero, notifying waiters");
    }
  }

  /// Waits asynchronously until the WaitGroup counter becomes zero.
  ///
  /// If the counter is already zero when called, returns immediately.
  pub async fn wait(&self) {
    loop {
      // Register interest before reading the count so a done() racing with
      // this check cannot slip its notify_waiters() past us.
      let notified = self.notify_on_zero.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      if self.count.load(Ordering::Acquire) == 0 {
        tracing::trace!("WaitGroup::wait() released");
        return;
      }
      notified.await;
    }
  }

  /// Returns the current count. Primarily for debugging/testing.
  pub fn get_count(&self) -> usize {
    self.count.load(Ordering::Relaxed)
  }
}

impl Default for WaitGroup {
  fn default() -> Self {
    Self::new()
  }
}

/// Calls `WaitGroup::done` exactly once when dropped.
#[derive(Debug)]
pub struct WaitGroupGuard {
  wg: WaitGroup,
}

impl Drop for WaitGroupGuard {
  fn drop(&mut self) {
    self.wg.done();
  }
}
