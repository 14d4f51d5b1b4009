use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tributary::{AggregateOptions, Event, FanIn};

use crate::cli::SelectArgs;

pub async fn run(args: SelectArgs) -> Result<()> {
  let interval = Duration::from_millis(args.interval_ms);
  let (producers, mut agg) =
    FanIn::<usize>::with_producers(args.producers, AggregateOptions::default()).context("creating fan-in")?;

  for producer in producers {
    let count = (producer.source_id().index() + 1) * 2;
    tokio::spawn(async move {
      for value in 0..count {
        if let Err(e) = producer.send(value).await {
          if !e.is_closed() {
            warn!("channel {} failed to send: {}", producer.source_id(), e);
          }
          return;
        }
        tokio::time::sleep(interval).await;
      }
    });
  }

  while let Some(event) = agg.next_event().await {
    match event {
      Event::Item { source, payload } => info!("channel {} sent {}", source, payload),
      Event::Closed { source, .. } => info!("channel {} closed", source),
    }
  }

  let summary = agg.finish().await?;
  info!("received {} values from {} channels", summary.total_items(), summary.producers);
  Ok(())
}
