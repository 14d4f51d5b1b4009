// src/queue/mod.rs

//! Work-distribution queue: one shared conduit drained by a pool of workers.
//!
//! Every enqueued item is received by exactly one worker. Closing the queue
//! lets workers finish what is already in the conduit and then exit;
//! `join` waits for all of them.
//!
//! A worker fault is an `Err` returned by, or a panic inside, the handler for
//! one item. Under `FaultPolicy::Isolate` the fault is recorded and the worker
//! keeps going. Under `FaultPolicy::Escalate` the first fault cancels the
//! whole queue: workers stop pulling, `enqueue` fails, and `join` returns the
//! fault.

mod worker;

pub use worker::{worker_fn, FnWorker, Worker};

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::TributaryError;
use crate::options::{FaultPolicy, QueueOptions};
use crate::runtime::{conduit, panic_message, ConduitReceiver, ConduitSender, WaitGroup, WaitGroupGuard};

/// A failure recorded for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
  pub worker_id: usize,
  pub message: String,
  pub panicked: bool,
}

/// Per-worker accounting, final once `join` returns.
#[derive(Debug, Clone, Default)]
pub struct QueueReport {
  /// Items taken off the queue by each worker, faulted ones included.
  pub handled: Vec<u64>,
  pub faults: Vec<WorkerFault>,
  pub cancelled: bool,
}

impl QueueReport {
  pub fn total_handled(&self) -> u64 {
    self.handled.iter().sum()
  }
}

/// Cloneable handle for feeding a `WorkQueue` from several tasks.
#[derive(Debug)]
pub struct Enqueuer<T> {
  tx: ConduitSender<T>,
  cancel: CancellationToken,
}

impl<T> Clone for Enqueuer<T> {
  fn clone(&self) -> Self {
    Self {
      tx: self.tx.clone(),
      cancel: self.cancel.clone(),
    }
  }
}

impl<T> Enqueuer<T> {
  /// Waits until the conduit has room, then hands `item` over.
  /// Fails with `QueueClosed` once the queue is closed or cancelled.
  pub async fn enqueue(&self, item: T) -> Result<(), TributaryError> {
    if self.cancel.is_cancelled() {
      return Err(TributaryError::QueueClosed);
    }
    let sent = tokio::select! {
      biased;
      _ = self.cancel.cancelled() => return Err(TributaryError::QueueClosed),
      res = self.tx.send(item) => res,
    };
    sent.map_err(|_| TributaryError::QueueClosed)
  }
}

pub struct WorkQueue<T> {
  options: QueueOptions,
  enqueuer: Enqueuer<T>,
  rx: Option<ConduitReceiver<T>>,
  cancel: CancellationToken,
  workers: WaitGroup,
  report: Arc<Mutex<QueueReport>>,
}

impl<T: Send + 'static> WorkQueue<T> {
  pub fn new(options: QueueOptions) -> Result<Self, TributaryError> {
    options.validate()?;
    let (tx, rx) = conduit(options.capacity);
    let cancel = CancellationToken::new();
    Ok(Self {
      enqueuer: Enqueuer {
        tx,
        cancel: cancel.clone(),
      },
      rx: Some(rx),
      cancel,
      workers: WaitGroup::new(),
      report: Arc::new(Mutex::new(QueueReport {
        handled: vec![0; options.workers],
        ..Default::default()
      })),
      options,
    })
  }

  /// `new` followed by `spawn_workers`.
  pub fn start<W: Worker<T>>(options: QueueOptions, worker: W) -> Result<Self, TributaryError> {
    let mut queue = Self::new(options)?;
    queue.spawn_workers(worker)?;
    Ok(queue)
  }

  /// Starts `options.workers` tasks sharing `worker`. Can only be done once.
  pub fn spawn_workers<W: Worker<T>>(&mut self, worker: W) -> Result<(), TributaryError> {
    let rx = self.rx.take().ok_or(TributaryError::InvalidState("workers already spawned"))?;
    let worker = Arc::new(worker);
    for worker_id in 0..self.options.workers {
      let ctx = WorkerContext {
        worker_id,
        rx: rx.clone(),
        worker: worker.clone(),
        cancel: self.cancel.clone(),
        policy: self.options.fault_policy,
        report: self.report.clone(),
        _wg_guard: self.workers.enter(),
      };
      tokio::spawn(ctx.run());
    }
    debug!(workers = self.options.workers, policy = ?self.options.fault_policy, "Worker pool started");
    Ok(())
  }

  pub async fn enqueue(&self, item: T) -> Result<(), TributaryError> {
    self.enqueuer.enqueue(item).await
  }

  pub fn enqueuer(&self) -> Enqueuer<T> {
    self.enqueuer.clone()
  }

  /// No further items will be accepted. Items already in the conduit are
  /// still delivered.
  pub fn close(&self) {
    if self.enqueuer.tx.close() {
      debug!("Work queue closed");
    }
  }

  /// Stops the pool without draining. Items still in the conduit are dropped.
  pub fn cancel(&self) {
    self.cancel.cancel();
    self.enqueuer.tx.close();
    self.report.lock().cancelled = true;
  }

  pub fn is_closed(&self) -> bool {
    self.enqueuer.tx.is_closed()
  }

  /// Waits for every worker to exit. Only returns after `close` (or
  /// `cancel`, or an escalated fault); joining an open queue waits for one
  /// of those. Fails with `InvalidState` if no workers were ever spawned.
  pub async fn join(&self) -> Result<QueueReport, TributaryError> {
    if self.rx.is_some() {
      return Err(TributaryError::InvalidState("workers not spawned"));
    }
    self.workers.wait().await;
    let report = self.report.lock().clone();
    debug!(handled = report.total_handled(), faults = report.faults.len(), "Worker pool joined");

    if self.options.fault_policy == FaultPolicy::Escalate {
      if let Some(fault) = report.faults.first() {
        return Err(TributaryError::WorkerFault {
          worker_id: fault.worker_id,
          message: fault.message.clone(),
        });
      }
    }
    Ok(report)
  }
}

struct WorkerContext<T, W> {
  worker_id: usize,
  rx: ConduitReceiver<T>,
  worker: Arc<W>,
  cancel: CancellationToken,
  policy: FaultPolicy,
  report: Arc<Mutex<QueueReport>>,
  // Last field, dropped last: join() only returns once the worker's
  // receiver and handler are released.
  _wg_guard: WaitGroupGuard,
}

impl<T: Send + 'static, W: Worker<T>> WorkerContext<T, W> {
  async fn run(self) {
    let worker_id = self.worker_id;
    debug!(worker_id, "Worker started");

    loop {
      let received = tokio::select! {
        biased;
        _ = self.cancel.cancelled() => None,
        item = self.rx.recv() => item.ok(),
      };
      let Some(item) = received else {
        break;
      };

      let result = AssertUnwindSafe(self.worker.process(worker_id, item)).catch_unwind().await;
      let fault = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(WorkerFault {
          worker_id,
          message: e.to_string(),
          panicked: false,
        }),
        Err(panic) => Some(WorkerFault {
          worker_id,
          message: panic_message(panic.as_ref()),
          panicked: true,
        }),
      };

      {
        let mut report = self.report.lock();
        report.handled[worker_id] += 1;
        if let Some(fault) = &fault {
          report.faults.push(fault.clone());
        }
      }

      match fault {
        None => trace!(worker_id, "Item processed"),
        Some(fault) => {
          warn!(worker_id, panicked = fault.panicked, error = %fault.message, "Worker fault");
          if self.policy == FaultPolicy::Escalate {
            warn!(worker_id, "Escalating fault; shutting the queue down");
            self.report.lock().cancelled = true;
            self.cancel.cancel();
            self.rx.close();
            break;
          }
        }
      }
    }

    debug!(worker_id, "Worker exiting");
  }
}
