use clap::Parser;

#[derive(Parser, Debug)]
#[clap(name = "tributary", version, about = "Fan-in and work-queue demos")]
pub struct Cli {
  /// Log filter used when RUST_LOG is unset
  #[clap(long, global = true, default_value = "tributary=info,info")]
  pub log: String,

  #[clap(subcommand)]
  pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
  /// Several workers draining one shared queue
  WorkQueue(WorkQueueArgs),
  /// Several timed producers merged into one aggregate stream
  Select(SelectArgs),
  /// Run a command and show its stdout and stderr as they arrive
  Run(RunArgs),
}

#[derive(Parser, Debug)]
pub struct WorkQueueArgs {
  /// Number of workers pulling from the queue
  #[clap(long, short, default_value_t = 3)]
  pub workers: usize,

  /// Number of integers to enqueue (0..items)
  #[clap(long, short, default_value_t = 20)]
  pub items: u32,

  /// Queue capacity (1 = a single in-flight item)
  #[clap(long, default_value_t = 1)]
  pub capacity: usize,
}

#[derive(Parser, Debug)]
pub struct SelectArgs {
  /// Number of producers; producer i sends (i + 1) * 2 values
  #[clap(long, short, default_value_t = 3)]
  pub producers: usize,

  /// Pause after each send, in milliseconds
  #[clap(long, default_value_t = 1000)]
  pub interval_ms: u64,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
  /// Maximum bytes per forwarded chunk
  #[clap(long, default_value_t = tributary::options::DEFAULT_CHUNK_SIZE)]
  pub chunk_size: usize,

  /// Command to run
  pub program: String,

  /// Arguments passed to the command
  #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
  pub args: Vec<String>,
}
