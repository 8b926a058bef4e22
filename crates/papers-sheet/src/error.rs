//! Error types for `papers-sheet`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("spreadsheet error: {0}")]
  Spreadsheet(#[from] calamine::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("unsupported file type: {0}")]
  UnsupportedFormat(String),

  #[error("no readable sheets found")]
  NoReadableSheets,

  #[error("sheet not found: {0}")]
  SheetNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
