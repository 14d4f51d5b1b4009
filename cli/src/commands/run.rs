use std::process::Stdio;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::process::Command;
use tracing::{info, warn};
use tributary::capture::{self, StreamKind};
use tributary::{CaptureOptions, Event, TributaryError};

use crate::cli::RunArgs;

pub async fn run(args: RunArgs) -> Result<()> {
  let options = CaptureOptions::default().with_chunk_size(args.chunk_size);

  // Spawning and exit status are ours; the library only sees the two pipes.
  let mut child = Command::new(&args.program)
    .args(&args.args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(|e| TributaryError::from_io_setup(e, &args.program))
    .context("running cmd")?;

  let stdout = child
    .stdout
    .take()
    .ok_or_else(|| TributaryError::SetupFailure("stdout pipe missing".into()))?;
  let stderr = child
    .stderr
    .take()
    .ok_or_else(|| TributaryError::SetupFailure("stderr pipe missing".into()))?;

  let agg = capture::capture(stdout, stderr, &options)?;
  let captured = capture::collect(agg, log_event).await;

  let status = child.wait().await.context("waiting for command")?;
  match status.code() {
    Some(code) => info!("Exit status: {}", code),
    None => warn!("Process terminated by signal"),
  }

  let captured = captured?;
  info!(
    "captured {} bytes on stdout, {} bytes on stderr",
    captured.stdout.len(),
    captured.stderr.len()
  );
  Ok(())
}

fn log_event(kind: StreamKind, event: &Event<Bytes>) {
  match event {
    Event::Item { payload, .. } => info!("channel {} sent {}", kind, String::from_utf8_lossy(payload)),
    Event::Closed { outcome, .. } => info!("channel {} closed ({})", kind, outcome),
  }
}
