//! Tracing subscriber setup.

use std::{
  fs::{self, OpenOptions},
  path::Path,
  sync::Mutex,
};

use anyhow::Context as _;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "papers.log";

/// Install the global subscriber. Events go to `<log_dir>/papers.log`
/// (appended) when a log directory is configured, otherwise to stderr.
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<()> {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  match log_dir {
    Some(dir) => {
      fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
      let path = dir.join(LOG_FILE);
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    }
  }
  Ok(())
}
