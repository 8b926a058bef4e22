//! Error types for `papers-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown field: {0:?}")]
  UnknownField(String),

  #[error("invalid year: {0:?}")]
  InvalidYear(String),

  #[error("unknown naming scheme: {0:?}")]
  UnknownScheme(String),

  #[error("unknown lookup kind: {0:?}")]
  UnknownLookupKind(String),

  #[error("unknown delete policy: {0:?}")]
  UnknownDeletePolicy(String),

  /// Lookup codes are exactly four ASCII letters or digits.
  #[error("invalid lookup code {0:?}: expected 4 letters or digits")]
  InvalidCode(String),

  #[error("lookup name must not be empty")]
  EmptyLookupName,

  #[error("malformed assignment {0:?}: expected FIELD=VALUE")]
  MalformedAssignment(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
