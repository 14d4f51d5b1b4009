// tests/capture.rs
#![cfg(unix)]

use std::process::Stdio;

use tokio::process::Command;
use tributary::capture::{self, StreamKind};
use tributary::{CaptureOptions, Event, SourceId};
mod common;

fn spawn_sh(script: &str) -> tokio::process::Child {
  Command::new("sh")
    .arg("-c")
    .arg(script)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .expect("failed to spawn sh")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hundred_bytes_on_stdout_nothing_on_stderr() {
  common::setup_tracing();
  // Tiny chunks so the 100 bytes are very likely split across events.
  for chunk_size in [7, 10240] {
    let mut child = spawn_sh("head -c 100 /dev/zero");
    let stdout = child.stdout.take().unwrap();
    let stderr = child.stderr.take().unwrap();
    let mut agg = capture::capture(stdout, stderr, &CaptureOptions::default().with_chunk_size(chunk_size)).unwrap();

    let events = common::drain(&mut agg).await;
    let stdout_bytes: usize = events
      .iter()
      .filter(|e| e.source_id() == SourceId(0))
      .filter_map(|e| e.payload().map(|chunk| chunk.len()))
      .sum();
    let stdout_items = events.iter().filter(|e| e.source_id() == SourceId(0) && !e.is_terminal()).count();
    let stderr_items = events.iter().filter(|e| e.source_id() == SourceId(1) && !e.is_terminal()).count();

    assert_eq!(stdout_bytes, 100);
    assert!(stdout_items >= 1);
    assert_eq!(stderr_items, 0);
    for source in [SourceId(0), SourceId(1)] {
      let terminals = events.iter().filter(|e| e.is_terminal() && e.source_id() == source).count();
      assert_eq!(terminals, 1, "source {} must close exactly once", source);
    }

    assert!(child.wait().await.unwrap().success());
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interleaved_streams_are_kept_apart() {
  common::setup_tracing();
  let mut child = spawn_sh("for i in 1 2 3; do echo out$i; echo err$i >&2; done; exit 3");
  let stdout = child.stdout.take().unwrap();
  let stderr = child.stderr.take().unwrap();
  let agg = capture::capture(stdout, stderr, &CaptureOptions::default()).unwrap();

  let mut closes = Vec::new();
  let output = capture::collect(agg, |kind, ev: &Event<bytes::Bytes>| {
    if ev.is_terminal() {
      closes.push(kind);
    }
  })
  .await
  .unwrap();

  assert_eq!(&output.stdout[..], b"out1\nout2\nout3\n");
  assert_eq!(&output.stderr[..], b"err1\nerr2\nerr3\n");
  closes.sort_by_key(|k| k.source_id());
  assert_eq!(closes, vec![StreamKind::Stdout, StreamKind::Stderr]);

  let status = child.wait().await.unwrap();
  assert_eq!(status.code(), Some(3));
}
