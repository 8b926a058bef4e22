//! SQLite backend for the papers database.
//!
//! Wraps [`tokio_rusqlite`] so every operation runs as one closure on the
//! connection's own thread. Each closure owns at most one transaction, which
//! is committed or rolled back before the call returns.

mod encode;
mod ops;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;
