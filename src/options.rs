use crate::error::TributaryError;

/// Capacity of a conduit when none is given. One in-flight item: a sender
/// blocks until the previous item has been taken by a receiver.
pub const DEFAULT_CONDUIT_CAPACITY: usize = 1;
/// Worker count used by `QueueOptions::default()`.
pub const DEFAULT_WORKER_COUNT: usize = 3;
/// Read buffer size for byte-stream producers.
pub const DEFAULT_CHUNK_SIZE: usize = 10240;

/// What the work queue does when a worker's handler fails or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
  /// Record the fault and keep the worker pulling items.
  #[default]
  Isolate,
  /// Record the fault and shut the whole queue down.
  Escalate,
}

/// Settings for a `WorkQueue`.
#[derive(Debug, Clone)]
pub struct QueueOptions {
  pub workers: usize,
  pub capacity: usize,
  pub fault_policy: FaultPolicy,
}

impl Default for QueueOptions {
  fn default() -> Self {
    Self {
      workers: DEFAULT_WORKER_COUNT,
      capacity: DEFAULT_CONDUIT_CAPACITY,
      fault_policy: FaultPolicy::default(),
    }
  }
}

impl QueueOptions {
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers;
    self
  }

  pub fn with_capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
    self.fault_policy = fault_policy;
    self
  }

  pub fn validate(&self) -> Result<(), TributaryError> {
    if self.workers == 0 {
      return Err(TributaryError::InvalidArgument("worker count must be at least 1".into()));
    }
    if self.capacity == 0 {
      return Err(TributaryError::InvalidArgument("queue capacity must be at least 1".into()));
    }
    Ok(())
  }
}

/// Settings for a `FanIn`.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
  /// Capacity of the shared aggregate conduit.
  pub capacity: usize,
  /// Capacity of each producer's private conduit created by `FanIn::producer`.
  pub source_capacity: usize,
}

impl Default for AggregateOptions {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CONDUIT_CAPACITY,
      source_capacity: DEFAULT_CONDUIT_CAPACITY,
    }
  }
}

impl AggregateOptions {
  pub fn with_capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  pub fn with_source_capacity(mut self, source_capacity: usize) -> Self {
    self.source_capacity = source_capacity;
    self
  }

  pub fn validate(&self) -> Result<(), TributaryError> {
    if self.capacity == 0 || self.source_capacity == 0 {
      return Err(TributaryError::InvalidArgument("conduit capacity must be at least 1".into()));
    }
    Ok(())
  }
}

/// Settings for byte-stream capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
  pub aggregate: AggregateOptions,
  /// Maximum bytes carried by a single chunk event.
  pub chunk_size: usize,
}

impl Default for CaptureOptions {
  fn default() -> Self {
    Self {
      aggregate: AggregateOptions::default(),
      chunk_size: DEFAULT_CHUNK_SIZE,
    }
  }
}

impl CaptureOptions {
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  pub fn validate(&self) -> Result<(), TributaryError> {
    self.aggregate.validate()?;
    if self.chunk_size == 0 {
      return Err(TributaryError::InvalidArgument("chunk size must be at least 1".into()));
    }
    Ok(())
  }
}
