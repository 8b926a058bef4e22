//! Error type for `papers-store-sqlite`.

use papers_core::{lookup::LookupKind, paper::PaperId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] papers_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("paper not found: {0}")]
  PaperNotFound(PaperId),

  #[error("{kind} not found: {code}")]
  LookupNotFound { kind: LookupKind, code: String },

  /// The delete policy is `restrict` and papers still reference the code.
  #[error("{kind} {code} is used by {papers} papers")]
  LookupInUse { kind: LookupKind, code: String, papers: usize },

  #[error("a {kind} named {name:?} already exists")]
  DuplicateLookupName { kind: LookupKind, name: String },

  #[error("{kind} code {code} is already taken")]
  DuplicateLookupCode { kind: LookupKind, code: String },

  #[error("no free {kind} code left for {base}")]
  CodesExhausted { kind: LookupKind, base: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
