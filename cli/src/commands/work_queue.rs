use anyhow::{Context, Result};
use tracing::info;
use tributary::{worker_fn, BoxError, QueueOptions, WorkQueue};

use crate::cli::WorkQueueArgs;

pub async fn run(args: WorkQueueArgs) -> Result<()> {
  let options = QueueOptions::default()
    .with_workers(args.workers)
    .with_capacity(args.capacity);

  let queue = WorkQueue::<u32>::start(
    options,
    worker_fn(|worker_id, value: u32| async move {
      info!("worker {} got value {}", worker_id, value);
      Ok::<(), BoxError>(())
    }),
  )
  .context("starting worker pool")?;

  for value in 0..args.items {
    queue.enqueue(value).await.context("enqueueing")?;
  }
  queue.close();

  let report = queue.join().await.context("joining worker pool")?;
  for (worker_id, handled) in report.handled.iter().enumerate() {
    info!("worker {} handled {} values", worker_id, handled);
  }
  Ok(())
}
