//! Turning a selected sheet into records.

use std::collections::BTreeMap;

use papers_core::paper::{Field, NewPaper, parse_year};

use crate::{
  normalize::{REQUIRED_ALIASES, column_names},
  workbook::{HEADER_ROWS, Sheet},
};

/// Records prepared from one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportBatch {
  pub sheet:         String,
  /// Retained column names in sheet order, followed by any required field
  /// the sheet lacked.
  pub columns:       Vec<String>,
  pub papers:        Vec<NewPaper>,
  /// Rows below the header with no values at all.
  pub skipped_rows:  usize,
  /// Rows imported without a year because the cell was not a whole number.
  pub invalid_years: usize,
}

/// Normalize `sheet` into records: row one is a banner, row two the header.
pub fn prepare(sheet: &Sheet) -> ImportBatch {
  let width = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
  let header: Vec<String> = (0..width)
    .map(|i| {
      sheet
        .rows
        .get(HEADER_ROWS - 1)
        .and_then(|row| row.get(i))
        .map(|c| c.to_text())
        .unwrap_or_default()
    })
    .collect();
  let kept: Vec<(usize, String)> = column_names(&header)
    .into_iter()
    .enumerate()
    .filter_map(|(i, name)| name.map(|n| (i, n)))
    .collect();

  let mut skipped_rows = 0;
  let mut rows: Vec<BTreeMap<String, String>> = Vec::new();
  for row in sheet.rows.iter().skip(HEADER_ROWS) {
    let values: BTreeMap<String, String> = kept
      .iter()
      .map(|(i, name)| {
        let value = row.get(*i).map(|c| c.to_text()).unwrap_or_default();
        (name.clone(), value.trim().to_owned())
      })
      .collect();
    if values.values().all(String::is_empty) {
      skipped_rows += 1;
      continue;
    }
    rows.push(values);
  }

  let mut columns: Vec<String> = kept.into_iter().map(|(_, n)| n).collect();
  fill_from_aliases(&columns, &mut rows);
  for field in Field::REQUIRED {
    if !columns.iter().any(|c| c == field.as_str()) {
      columns.push(field.as_str().to_owned());
    }
  }

  let mut invalid_years = 0;
  let papers = rows
    .into_iter()
    .map(|values| {
      let (paper, bad_year) = to_paper(values);
      invalid_years += usize::from(bad_year);
      paper
    })
    .collect::<Vec<_>>();

  tracing::info!(
    sheet = %sheet.name,
    rows = papers.len(),
    skipped_rows,
    invalid_years,
    "prepared import"
  );
  ImportBatch { sheet: sheet.name.clone(), columns, papers, skipped_rows, invalid_years }
}

/// Copy an alias column into each required field that is missing or blank
/// in every row.
fn fill_from_aliases(columns: &[String], rows: &mut [BTreeMap<String, String>]) {
  let has_data = |rows: &[BTreeMap<String, String>], col: &str| {
    rows.iter().any(|r| r.get(col).is_some_and(|v| !v.is_empty()))
  };
  for (field, aliases) in REQUIRED_ALIASES {
    let target = field.as_str();
    if has_data(rows, target) {
      continue;
    }
    let source = aliases
      .iter()
      .find(|alias| columns.iter().any(|c| c == *alias) && has_data(rows, alias));
    if let Some(source) = source {
      tracing::debug!(%field, alias = source, "filling column from alias");
      for row in rows.iter_mut() {
        let value = row.get(*source).cloned().unwrap_or_default();
        row.insert(target.to_owned(), value);
      }
    }
  }
}

/// Build one record. The flag reports a year that had to be dropped.
fn to_paper(values: BTreeMap<String, String>) -> (NewPaper, bool) {
  let mut paper = NewPaper::default();
  let mut bad_year = false;
  for (name, value) in values {
    match name.parse::<Field>() {
      Ok(Field::Year) => {
        paper.fields.year = parse_year(&value);
        bad_year = paper.fields.year.is_none() && !value.is_empty();
      }
      // Every other field accepts any text.
      Ok(field) => {
        let _ = paper.fields.set(field, &value);
      }
      Err(_) if value.is_empty() => {}
      Err(_) => {
        paper.extras.insert(name, value);
      }
    }
  }
  (paper, bad_year)
}
