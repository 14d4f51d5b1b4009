mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  let cli_args = Cli::parse();
  init_tracing(&cli_args.log);

  match cli_args.command {
    Commands::WorkQueue(args) => commands::work_queue::run(args).await,
    Commands::Select(args) => commands::select::run(args).await,
    Commands::Run(args) => commands::run::run(args).await,
  }
}

fn init_tracing(default_filter: &str) {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .init();
}
