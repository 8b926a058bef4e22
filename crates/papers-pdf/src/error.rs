//! Error types for `papers-pdf`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no PDF file associated with this record")]
  NoPdf,

  #[error("no DOI associated with this record")]
  NoDoi,

  #[error("file not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("target file already exists: {}", .0.display())]
  TargetExists(PathBuf),

  #[error("failed to launch {program}: {source}")]
  Launch {
    program: &'static str,
    #[source]
    source:  std::io::Error,
  },

  #[error("{program} exited with {status}")]
  Handler {
    program: &'static str,
    status:  std::process::ExitStatus,
  },

  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Error::Io { path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
