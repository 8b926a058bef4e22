//! Paper records, the single entity the database stores.
//!
//! A record has a fixed set of well-known fields plus an open set of
//! extension fields carried over from imported spreadsheets. The store owns
//! the identifier, the derived unique name and both timestamps.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Store-assigned identifier. Monotonically increasing and never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PaperId(pub i64);

impl fmt::Display for PaperId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for PaperId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.trim().parse().map(PaperId) }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The well-known columns of the `papers` table.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
  Title,
  Authors,
  Year,
  Journal,
  Doi,
  Url,
  Abstract,
  Keywords,
  Tags,
  Notes,
  Status,
  Pdf,
  Category,
  Project,
}

impl Field {
  /// Columns every imported row is guaranteed to carry.
  pub const REQUIRED: [Field; 12] = [
    Field::Title,
    Field::Authors,
    Field::Year,
    Field::Journal,
    Field::Doi,
    Field::Url,
    Field::Abstract,
    Field::Keywords,
    Field::Tags,
    Field::Notes,
    Field::Status,
    Field::Pdf,
  ];

  pub const ALL: [Field; 14] = [
    Field::Title,
    Field::Authors,
    Field::Year,
    Field::Journal,
    Field::Doi,
    Field::Url,
    Field::Abstract,
    Field::Keywords,
    Field::Tags,
    Field::Notes,
    Field::Status,
    Field::Pdf,
    Field::Category,
    Field::Project,
  ];

  /// Text columns covered by free-text search.
  pub const SEARCHABLE: [Field; 7] = [
    Field::Title,
    Field::Authors,
    Field::Journal,
    Field::Abstract,
    Field::Keywords,
    Field::Tags,
    Field::Notes,
  ];

  /// Column name, identical to the normalized spreadsheet header.
  pub fn as_str(self) -> &'static str {
    match self {
      Field::Title => "title",
      Field::Authors => "authors",
      Field::Year => "year",
      Field::Journal => "journal",
      Field::Doi => "doi",
      Field::Url => "url",
      Field::Abstract => "abstract",
      Field::Keywords => "keywords",
      Field::Tags => "tags",
      Field::Notes => "notes",
      Field::Status => "status",
      Field::Pdf => "pdf",
      Field::Category => "category",
      Field::Project => "project",
    }
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Field {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().to_ascii_lowercase();
    Field::ALL
      .into_iter()
      .find(|f| f.as_str() == wanted)
      .ok_or_else(|| Error::UnknownField(s.to_owned()))
  }
}

/// Parse a year the way spreadsheets hand them over: `"2023"` or `"2023.0"`.
///
/// Returns `None` for anything that is not a whole number.
pub fn parse_year(raw: &str) -> Option<i32> {
  let raw = raw.trim();
  if let Ok(y) = raw.parse::<i32>() {
    return Some(y);
  }
  let f = raw.parse::<f64>().ok()?;
  (f.is_finite() && f.fract() == 0.0 && f.abs() < i32::MAX as f64).then_some(f as i32)
}

/// The well-known field values of a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperFields {
  pub title:    String,
  pub authors:  String,
  pub year:     Option<i32>,
  pub journal:  String,
  pub doi:      String,
  pub url:      String,
  pub r#abstract: String,
  pub keywords: String,
  pub tags:     String,
  pub notes:    String,
  pub status:   String,
  pub pdf:      String,
  pub category: Option<String>,
  pub project:  Option<String>,
}

impl PaperFields {
  /// Textual value of `field`; absent values read as the empty string.
  pub fn get(&self, field: Field) -> String {
    match field {
      Field::Year => self.year.map(|y| y.to_string()).unwrap_or_default(),
      Field::Category => self.category.clone().unwrap_or_default(),
      Field::Project => self.project.clone().unwrap_or_default(),
      other => self.text(other).map(str::to_owned).unwrap_or_default(),
    }
  }

  /// Assign `field` from text. Values are trimmed; lookup codes are
  /// uppercased and an empty code clears the reference.
  pub fn set(&mut self, field: Field, value: &str) -> Result<()> {
    let value = value.trim();
    match field {
      Field::Year => {
        self.year = if value.is_empty() {
          None
        } else {
          Some(parse_year(value).ok_or_else(|| Error::InvalidYear(value.to_owned()))?)
        };
      }
      Field::Category => self.category = code_value(value),
      Field::Project => self.project = code_value(value),
      other => {
        if let Some(slot) = self.text_mut(other) {
          *slot = value.to_owned();
        }
      }
    }
    Ok(())
  }

  fn text(&self, field: Field) -> Option<&str> {
    Some(match field {
      Field::Title => &self.title,
      Field::Authors => &self.authors,
      Field::Journal => &self.journal,
      Field::Doi => &self.doi,
      Field::Url => &self.url,
      Field::Abstract => &self.r#abstract,
      Field::Keywords => &self.keywords,
      Field::Tags => &self.tags,
      Field::Notes => &self.notes,
      Field::Status => &self.status,
      Field::Pdf => &self.pdf,
      Field::Year | Field::Category | Field::Project => return None,
    })
  }

  fn text_mut(&mut self, field: Field) -> Option<&mut String> {
    Some(match field {
      Field::Title => &mut self.title,
      Field::Authors => &mut self.authors,
      Field::Journal => &mut self.journal,
      Field::Doi => &mut self.doi,
      Field::Url => &mut self.url,
      Field::Abstract => &mut self.r#abstract,
      Field::Keywords => &mut self.keywords,
      Field::Tags => &mut self.tags,
      Field::Notes => &mut self.notes,
      Field::Status => &mut self.status,
      Field::Pdf => &mut self.pdf,
      Field::Year | Field::Category | Field::Project => return None,
    })
  }
}

fn code_value(value: &str) -> Option<String> {
  (!value.is_empty()).then(|| value.to_uppercase())
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Input to [`PaperStore::create`](crate::store::PaperStore::create) and bulk
/// import. Identifier, unique name and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaper {
  #[serde(flatten)]
  pub fields: PaperFields,
  /// Extension columns keyed by normalized name.
  #[serde(default)]
  pub extras: BTreeMap<String, String>,
}

impl NewPaper {
  /// Build a record from `FIELD=VALUE` assignments. Names that are not a
  /// [`Field`] become extension fields.
  pub fn from_assignments<'a>(assignments: impl IntoIterator<Item = &'a str>) -> Result<Self> {
    let mut paper = NewPaper::default();
    for raw in assignments {
      let (name, value) = parse_assignment(raw)?;
      match name.parse::<Field>() {
        Ok(field) => paper.fields.set(field, &value)?,
        Err(_) => {
          if !value.is_empty() {
            paper.extras.insert(name, value);
          }
        }
      }
    }
    Ok(paper)
  }
}

/// A persisted paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
  pub id:          PaperId,
  #[serde(flatten)]
  pub fields:      PaperFields,
  pub extras:      BTreeMap<String, String>,
  /// Empty when the configured naming scheme lacks required fields.
  pub unique_name: String,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// A set of field changes for [`PaperStore::update`](crate::store::PaperStore::update).
///
/// Values are validated when they are added, so applying a patch never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperPatch {
  fields: BTreeMap<Field, String>,
  /// Extension field changes; an empty value removes the field.
  extras: BTreeMap<String, String>,
}

impl PaperPatch {
  pub fn new() -> Self { Self::default() }

  /// Stage a well-known field change.
  pub fn set(mut self, field: Field, value: impl Into<String>) -> Result<Self> {
    let value = value.into();
    // Validate eagerly.
    PaperFields::default().set(field, &value)?;
    self.fields.insert(field, value);
    Ok(self)
  }

  /// Stage an extension field change.
  pub fn set_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.extras.insert(name.into(), value.into());
    self
  }

  /// Build a patch from `FIELD=VALUE` assignments.
  pub fn from_assignments<'a>(assignments: impl IntoIterator<Item = &'a str>) -> Result<Self> {
    let mut patch = PaperPatch::new();
    for raw in assignments {
      let (name, value) = parse_assignment(raw)?;
      patch = match name.parse::<Field>() {
        Ok(field) => patch.set(field, value)?,
        Err(_) => patch.set_extra(name, value),
      };
    }
    Ok(patch)
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() && self.extras.is_empty() }

  pub fn extras(&self) -> &BTreeMap<String, String> { &self.extras }

  /// Apply the well-known field changes to `fields` and return the fields
  /// whose value actually changed.
  pub fn apply(&self, fields: &mut PaperFields) -> Vec<Field> {
    let mut changed = Vec::new();
    for (&field, value) in &self.fields {
      let before = fields.get(field);
      // Already validated in `set`.
      if fields.set(field, value).is_ok() && fields.get(field) != before {
        changed.push(field);
      }
    }
    changed
  }
}

/// Split `name=value`, normalizing the name to lowercase.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
  let (name, value) = raw
    .split_once('=')
    .ok_or_else(|| Error::MalformedAssignment(raw.to_owned()))?;
  let name = name.trim().to_ascii_lowercase();
  if name.is_empty() {
    return Err(Error::MalformedAssignment(raw.to_owned()));
  }
  Ok((name, value.trim().to_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_names_round_trip() {
    for field in Field::ALL {
      assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
    }
    assert!(matches!("published_in".parse::<Field>(), Err(Error::UnknownField(_))));
  }

  #[test]
  fn year_accepts_spreadsheet_floats() {
    assert_eq!(parse_year("2023"), Some(2023));
    assert_eq!(parse_year(" 2023.0 "), Some(2023));
    assert_eq!(parse_year("2023.5"), None);
    assert_eq!(parse_year("n.d."), None);
    assert_eq!(parse_year("NaN"), None);
  }

  #[test]
  fn set_rejects_bad_year_and_uppercases_codes() {
    let mut fields = PaperFields::default();
    assert!(matches!(fields.set(Field::Year, "soon"), Err(Error::InvalidYear(_))));
    fields.set(Field::Category, " brng ").unwrap();
    assert_eq!(fields.category.as_deref(), Some("BRNG"));
    fields.set(Field::Category, "").unwrap();
    assert_eq!(fields.category, None);
  }

  #[test]
  fn new_paper_from_assignments_splits_extras() {
    let paper =
      NewPaper::from_assignments(["title=Deep Nets", "year=2021", "Published_In=Nature"]).unwrap();
    assert_eq!(paper.fields.title, "Deep Nets");
    assert_eq!(paper.fields.year, Some(2021));
    assert_eq!(paper.extras.get("published_in").map(String::as_str), Some("Nature"));

    assert!(matches!(
      NewPaper::from_assignments(["title"]),
      Err(Error::MalformedAssignment(_))
    ));
  }

  #[test]
  fn patch_reports_only_real_changes() {
    let mut fields = PaperFields { title: "Same".into(), ..Default::default() };
    let patch = PaperPatch::new()
      .set(Field::Title, "Same")
      .unwrap()
      .set(Field::Year, "1999")
      .unwrap();
    let changed = patch.apply(&mut fields);
    assert_eq!(changed, vec![Field::Year]);
    assert_eq!(fields.year, Some(1999));
  }

  #[test]
  fn patch_validates_on_set() {
    assert!(PaperPatch::new().set(Field::Year, "19x9").is_err());
  }

  #[test]
  fn paper_serializes_abstract_under_plain_name() {
    let fields = PaperFields { r#abstract: "text".into(), ..Default::default() };
    let json = serde_json::to_value(&fields).unwrap();
    assert_eq!(json["abstract"], "text");
  }
}
