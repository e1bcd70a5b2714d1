use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

/// Stdout plus a persistent log file inside the mirror directory. The
/// returned guards must stay alive for the life of the process or tail
/// writes are lost.
pub fn init(log_dir: &Path, file_name: &str) -> anyhow::Result<Vec<WorkerGuard>> {
  let mut guards = Vec::new();

  std::fs::create_dir_all(log_dir)?;
  let file_appender = tracing_appender::rolling::never(log_dir, file_name);
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
  guards.push(guard);

  let (stdout_writer, guard) = tracing_appender::non_blocking(std::io::stdout());
  guards.push(guard);

  Registry::default()
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(EnvFilter::from_default_env()),
    )
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(stdout_writer)
        .with_filter(EnvFilter::from_default_env()),
    )
    .try_init()?;

  Ok(guards)
}
