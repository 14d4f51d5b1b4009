// src/aggregate/mod.rs

//! Fan-in aggregation.
//!
//! Each producer gets a private conduit and a forwarding task. The forwarder
//! relays the producer's items, tagged with its `SourceId`, into one shared
//! aggregate conduit and finishes with a single terminal event. The
//! `Aggregator` is the only reader of the shared conduit and stops once it
//! has seen a terminal event from every producer.
//!
//! ```text
//!   producer 0 ─▶ conduit ─▶ forwarder 0 ──┐
//!   producer 1 ─▶ conduit ─▶ forwarder 1 ──┼──▶ aggregate conduit ──▶ Aggregator
//!   producer 2 ─▶ conduit ─▶ forwarder 2 ──┘
//! ```
//!
//! Items from one producer arrive in the order it sent them. There is no
//! ordering across producers.

pub mod aggregator;
pub mod fan_in;
mod forwarder;
pub mod source;

pub use aggregator::{AggregateSummary, Aggregator};
pub use fan_in::{FanIn, Producer};
pub use source::{ChannelSource, ReaderSource, Source, StreamSource};
