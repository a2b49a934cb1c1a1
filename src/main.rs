use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pipeweave::graph::FanOutPolicy;
use pipeweave::loader::{Defaults, builtins, load_from_file};
use pipeweave::runner::Runner;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "pipeweave", version, about = "Run a dataflow pipeline described in YAML or JSON")]
struct Cli {
  /// Pipeline document to run.
  #[arg(long, default_value = "demos/md5/pipeline.yml")]
  pipeline: PathBuf,
  /// Directory walked by file walkers that configure none.
  #[arg(long, default_value = ".")]
  dir: PathBuf,
  /// Worker count of hashers that configure none.
  #[arg(long, default_value_t = 10)]
  parallelism: usize,
  /// Silence printers and lower logging to warnings.
  #[arg(long)]
  quiet: bool,
  /// Refuse to wire one output port to several inputs.
  #[arg(long)]
  strict_fan_out: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.quiet);

  let registry = builtins(Defaults {
    dir: cli.dir.clone(),
    workers: cli.parallelism,
    quiet: cli.quiet,
  });
  let graph = match load_from_file(&cli.pipeline, &registry) {
    Ok(graph) => graph,
    Err(err) => {
      error!(pipeline = %cli.pipeline.display(), "failed loading pipeline: {err}");
      return ExitCode::FAILURE;
    }
  };
  let fan_out = if cli.strict_fan_out {
    FanOutPolicy::Reject
  } else {
    FanOutPolicy::Compete
  };

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, stopping pipeline");
      on_interrupt.cancel();
    }
  });

  info!(pipeline = %cli.pipeline.display(), "running");
  match Runner::new(graph.with_fan_out(fan_out)).run(cancel).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!("pipeline error: {err}");
      ExitCode::FAILURE
    }
  }
}

fn init_tracing(quiet: bool) {
  let fallback = if quiet { "warn" } else { "info" };
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}
