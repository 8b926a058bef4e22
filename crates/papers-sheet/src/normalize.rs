//! Header normalization.

use std::collections::HashSet;

use papers_core::paper::Field;

/// Columns the store assigns itself; imported values are discarded.
pub const RESERVED_COLUMNS: [&str; 4] = ["id", "unique_name", "created_at", "updated_at"];

/// Fallback columns for required fields, in order of preference.
pub const REQUIRED_ALIASES: [(Field, &[&str]); 3] = [
  (Field::Journal, &["published_in", "project_id"]),
  (Field::Authors, &["author", "relates_to"]),
  (Field::Pdf, &["pdf_path", "file"]),
];

const SEP: char = '_';

/// Lowercase `raw` and collapse every run of non-alphanumeric characters
/// into one `_`, trimming it from both ends.
pub fn normalize_header(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut pending = false;
  for c in raw.chars() {
    if c.is_alphanumeric() {
      if pending && !out.is_empty() {
        out.push(SEP);
      }
      pending = false;
      out.extend(c.to_lowercase());
    } else {
      pending = true;
    }
  }
  out
}

/// Final column names for a header row. `None` marks a dropped column.
///
/// Blank headers are named `Unnamed: <index>` and, like every header
/// starting with `Unnamed`, dropped. Repeated names get `_2`, `_3`, ...
pub fn column_names(header: &[String]) -> Vec<Option<String>> {
  let mut seen = HashSet::new();
  header
    .iter()
    .enumerate()
    .map(|(idx, raw)| {
      let raw = raw.trim();
      let raw = if raw.is_empty() { format!("Unnamed: {idx}") } else { raw.to_owned() };
      if raw.starts_with("Unnamed") {
        return None;
      }
      let name = normalize_header(&raw);
      if name.is_empty() || RESERVED_COLUMNS.contains(&name.as_str()) {
        return None;
      }
      let mut unique = name.clone();
      let mut n = 2;
      while !seen.insert(unique.clone()) {
        unique = format!("{name}{SEP}{n}");
        n += 1;
      }
      Some(unique)
    })
    .collect()
}
