//! Domain model for the papers database: records, unique names, lookups,
//! and the [`PaperStore`](store::PaperStore) trait storage backends
//! implement.
//!
//! No database, filesystem or spreadsheet code lives here.

pub mod error;
pub mod lookup;
pub mod naming;
pub mod paper;
pub mod store;

pub use error::{Error, Result};
