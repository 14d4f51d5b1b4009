// tests/common.rs
#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use rand::Rng;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tributary::{Aggregator, Event};

static TRACING_INIT: Once = Once::new();

pub const LONG_TIMEOUT: Duration = Duration::from_secs(5);

// Can be overridden by the RUST_LOG env variable.
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "tributary=debug,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// Short random pause so producers interleave differently on every run.
pub async fn jitter(max_micros: u64) {
  let micros = rand::rng().random_range(0..=max_micros);
  tokio::time::sleep(Duration::from_micros(micros)).await;
}

/// Drains an aggregator to `Done` within `LONG_TIMEOUT`.
pub async fn drain<T: Send + 'static>(agg: &mut Aggregator<T>) -> Vec<Event<T>> {
  tokio::time::timeout(LONG_TIMEOUT, async {
    let mut events = Vec::new();
    while let Some(ev) = agg.next_event().await {
      events.push(ev);
    }
    events
  })
  .await
  .expect("aggregator did not reach Done in time")
}
