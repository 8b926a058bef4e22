//! Spreadsheet import and tabular export for the papers database.
//!
//! Reading turns a workbook (`.xlsx`, `.xlsm`, `.xls`, `.ods`) or a `.csv`
//! file into [`NewPaper`](papers_core::paper::NewPaper) records ready for a
//! single bulk insert. Export writes papers back out as CSV, BibTeX, or a
//! bundle directory holding both plus PDF copies. Pure synchronous; no
//! database dependency.
//!
//! # Quick start
//!
//! ```no_run
//! let batch = papers_sheet::load("papers.xlsx", None).unwrap();
//! println!("{} rows from sheet {:?}", batch.papers.len(), batch.sheet);
//! ```

mod bundle;
pub mod error;
pub mod export;
mod import;
mod normalize;
mod workbook;

pub use bundle::{BundleReport, export_bundle};
pub use error::{Error, Result};
pub use export::{export_bibtex, export_csv, write_bibtex, write_csv};
pub use import::{ImportBatch, prepare};
pub use normalize::{REQUIRED_ALIASES, RESERVED_COLUMNS, normalize_header};
pub use workbook::{Cell, Sheet, Workbook};

use std::path::Path;

/// Read `path`, pick a sheet and turn its rows into records.
///
/// `sheet` selects a sheet by name; without it the sheet with the most data
/// rows wins.
pub fn load(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<ImportBatch> {
  let workbook = Workbook::open(path)?;
  let selected = workbook.select(sheet)?;
  Ok(prepare(selected))
}
