// src/lib.rs

//! tributary - fan-in aggregation and work distribution on Tokio.
//!
//! Two building blocks:
//!
//! * [`WorkQueue`]: one shared conduit drained by N workers, each item
//!   delivered to exactly one of them.
//! * [`FanIn`] / [`Aggregator`]: M producers, each with a private conduit and
//!   a forwarding task, merged into one stream of source-tagged [`Event`]s
//!   that ends once every producer has closed.
//!
//! [`capture`] specializes the fan-in for a child process's stdout and
//! stderr.

/// Fan-in: producers, forwarding tasks, and the aggregator.
pub mod aggregate;
/// Process-output capture over two byte streams.
pub mod capture;
/// Error types used throughout the library.
pub mod error;
/// Source-tagged events and terminal outcomes.
pub mod event;
/// Tunables and their defaults.
pub mod options;
/// Work-distribution queue and worker pool.
pub mod queue;
/// Conduits, wait groups, and task guards.
pub mod runtime;

pub use aggregate::{AggregateSummary, Aggregator, FanIn, Producer, Source};
pub use capture::{CapturedOutput, StreamKind};
pub use error::{BoxError, TributaryError};
pub use event::{Event, Outcome, SourceId, StreamFault};
pub use options::{AggregateOptions, CaptureOptions, FaultPolicy, QueueOptions};
pub use queue::{worker_fn, QueueReport, WorkQueue, Worker, WorkerFault};

// Cancellation is part of the public API surface.
pub use tokio_util::sync::CancellationToken;

/// Major version number of the tributary library.
const VERSION_MAJOR: i32 = 0;
/// Minor version number of the tributary library.
const VERSION_MINOR: i32 = 1;
/// Patch version number of the tributary library.
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
///
/// # Examples
///
/// ```
/// let (major, minor, patch) = tributary::version();
/// println!("tributary version: {}.{}.{}", major, minor, patch);
/// ```
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}
