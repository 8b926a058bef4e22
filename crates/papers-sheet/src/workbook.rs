//! In-memory grid of cells read from a workbook or CSV file.

use std::path::Path;

use calamine::{Data, DataType as _, Reader as _, open_workbook_auto};
use chrono::{NaiveDateTime, NaiveTime};

use crate::{Error, Result};

/// Rows before the first data row: a banner, then the header.
pub const HEADER_ROWS: usize = 2;

/// Extensions handed to calamine.
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

// ─── Cells ───────────────────────────────────────────────────────────────────

/// One spreadsheet cell, reduced to the kinds the importer distinguishes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
  #[default]
  Empty,
  Text(String),
  Number(f64),
  Bool(bool),
  DateTime(NaiveDateTime),
}

impl Cell {
  /// Textual form used for import; nulls read as the empty string.
  ///
  /// Whole numbers lose their `.0`, so a year cell reads `2023`.
  pub fn to_text(&self) -> String {
    match self {
      Cell::Empty => String::new(),
      Cell::Text(s) if is_null_text(s) => String::new(),
      Cell::Text(s) => s.clone(),
      Cell::Number(n) if n.is_nan() => String::new(),
      Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
      Cell::Number(n) => n.to_string(),
      Cell::Bool(b) => b.to_string(),
      Cell::DateTime(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
      Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
  }

  pub fn is_empty(&self) -> bool { self.to_text().trim().is_empty() }
}

/// Spellings of a missing value that spreadsheet tools write out as text.
fn is_null_text(s: &str) -> bool {
  let s = s.trim();
  s.eq_ignore_ascii_case("nan") || s == "NaT"
}

impl From<&Data> for Cell {
  fn from(data: &Data) -> Self {
    match data {
      Data::Empty | Data::Error(_) => Cell::Empty,
      Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
      Data::Float(f) => Cell::Number(*f),
      Data::Int(i) => Cell::Number(*i as f64),
      Data::Bool(b) => Cell::Bool(*b),
      Data::DateTime(_) => data.as_datetime().map_or(Cell::Empty, Cell::DateTime),
    }
  }
}

// ─── Sheets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
  pub name: String,
  /// Every row from the top of the sheet, banner included.
  pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
  pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
    Self { name: name.into(), rows }
  }

  /// Rows below the header with at least one non-empty cell.
  pub fn data_rows(&self) -> usize {
    self
      .rows
      .iter()
      .skip(HEADER_ROWS)
      .filter(|row| row.iter().any(|c| !c.is_empty()))
      .count()
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
  pub sheets: Vec<Sheet>,
}

impl Workbook {
  /// Read every sheet of the file at `path`. A `.csv` file is one sheet
  /// named after the file; sheets that fail to read are skipped.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let ext = path
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase)
      .unwrap_or_default();
    if ext == "csv" {
      let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("csv");
      return Ok(Self { sheets: vec![read_csv(path, name)?] });
    }
    if !WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
      return Err(Error::UnsupportedFormat(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
      match workbook.worksheet_range(&name) {
        Ok(range) => {
          let (top, left) = range.start().unwrap_or((0, 0));
          let width = left as usize + range.width();
          let mut rows = vec![Vec::new(); top as usize];
          for row in range.rows() {
            let mut cells = vec![Cell::Empty; left as usize];
            cells.extend(row.iter().map(Cell::from));
            cells.resize(width, Cell::Empty);
            rows.push(cells);
          }
          sheets.push(Sheet::new(name, rows));
        }
        Err(e) => tracing::warn!(sheet = %name, error = %e, "could not read sheet; skipping"),
      }
    }
    tracing::debug!(path = %path.display(), sheets = sheets.len(), "read workbook");
    Ok(Self { sheets })
  }

  /// The named sheet, or the one with the most data rows (first on ties).
  pub fn select(&self, name: Option<&str>) -> Result<&Sheet> {
    if let Some(name) = name {
      return self
        .sheets
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::SheetNotFound(name.to_owned()));
    }
    let mut best: Option<(&Sheet, usize)> = None;
    for sheet in &self.sheets {
      let rows = sheet.data_rows();
      if rows > 0 && best.is_none_or(|(_, most)| rows > most) {
        best = Some((sheet, rows));
      }
    }
    let (sheet, rows) = best.ok_or(Error::NoReadableSheets)?;
    tracing::info!(sheet = %sheet.name, rows, "selected sheet");
    Ok(sheet)
  }
}

/// Read a CSV file without header handling; every record becomes a row.
fn read_csv(path: &Path, name: &str) -> Result<Sheet> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .from_path(path)?;
  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record?;
    rows.push(
      record
        .iter()
        .map(|v| if v.is_empty() { Cell::Empty } else { Cell::Text(v.to_owned()) })
        .collect(),
    );
  }
  Ok(Sheet::new(name, rows))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(s: &str) -> Cell { Cell::Text(s.into()) }

  #[test]
  fn numbers_print_like_spreadsheets() {
    assert_eq!(Cell::Number(2023.0).to_text(), "2023");
    assert_eq!(Cell::Number(1.5).to_text(), "1.5");
    assert_eq!(Cell::Number(f64::NAN).to_text(), "");
    assert_eq!(text("nan").to_text(), "");
    assert_eq!(text("Nancy").to_text(), "Nancy");
  }

  #[test]
  fn dates_drop_midnight() {
    let dt = chrono::NaiveDate::from_ymd_opt(2023, 1, 5)
      .unwrap()
      .and_hms_opt(0, 0, 0)
      .unwrap();
    assert_eq!(Cell::DateTime(dt).to_text(), "2023-01-05");
    let later = dt + chrono::Duration::hours(9);
    assert_eq!(Cell::DateTime(later).to_text(), "2023-01-05 09:00:00");
  }

  #[test]
  fn busiest_sheet_wins_and_ties_keep_order() {
    let row = |v: &str| vec![text(v)];
    let notes = Sheet::new("Notes", vec![row("banner"), row("h"), row("a")]);
    let papers = Sheet::new("Papers", vec![row("banner"), row("h"), row("a"), row("b")]);
    let copy = Sheet::new("Copy", papers.rows.clone());
    let workbook = Workbook { sheets: vec![notes, papers, copy] };

    assert_eq!(workbook.select(None).unwrap().name, "Papers");
    assert_eq!(workbook.select(Some("Notes")).unwrap().name, "Notes");
    assert!(matches!(workbook.select(Some("Missing")), Err(Error::SheetNotFound(_))));
  }

  #[test]
  fn sheets_without_data_are_unreadable() {
    let workbook = Workbook { sheets: vec![Sheet::new("Empty", vec![vec![text("banner")]])] };
    assert!(matches!(workbook.select(None), Err(Error::NoReadableSheets)));
  }

  #[test]
  fn csv_files_are_one_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.csv");
    std::fs::write(&path, "Papers export,,\nTitle,Year\nDeep Nets,2021,extra\n").unwrap();

    let workbook = Workbook::open(&path).unwrap();
    assert_eq!(workbook.sheets.len(), 1);
    let sheet = &workbook.sheets[0];
    assert_eq!(sheet.name, "library");
    assert_eq!(sheet.rows[1], vec![text("Title"), text("Year")]);
    assert_eq!(sheet.rows[2].len(), 3);
    assert_eq!(sheet.data_rows(), 1);
  }

  #[test]
  fn unknown_extensions_are_rejected() {
    let err = Workbook::open("notes.txt").unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
  }
}
