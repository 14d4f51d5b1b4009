use std::future::Future;

use crate::error::BoxError;

/// Processes items taken from a `WorkQueue`.
///
/// One instance is shared by every worker task of the pool; `worker_id`
/// tells the call which worker it runs on.
#[async_trait::async_trait]
pub trait Worker<T: Send + 'static>: Send + Sync + 'static {
  async fn process(&self, worker_id: usize, item: T) -> Result<(), BoxError>;
}

/// Adapts an async closure into a `Worker`. Built by `worker_fn`.
pub struct FnWorker<F> {
  f: F,
}

/// Wraps `f(worker_id, item)` as a `Worker`.
pub fn worker_fn<T, F, Fut>(f: F) -> FnWorker<F>
where
  F: Fn(usize, T) -> Fut,
  Fut: Future<Output = Result<(), BoxError>>,
{
  FnWorker { f }
}

#[async_trait::async_trait]
impl<T, F, Fut> Worker<T> for FnWorker<F>
where
  T: Send + 'static,
  F: Fn(usize, T) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
  async fn process(&self, worker_id: usize, item: T) -> Result<(), BoxError> {
    (self.f)(worker_id, item).await
  }
}
