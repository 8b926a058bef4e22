//! Unique-name generation.
//!
//! A unique name is a pure function of a handful of fields and, for the
//! counter-based schemes, a sequence number. Generation never fails: missing
//! inputs produce an empty string and the caller flags the record as
//! incomplete.
//!
//! | Scheme          | Pattern                           | Counter scope |
//! |-----------------|-----------------------------------|---------------|
//! | `hierarchical`  | `YYYY-TIxx-AUTHORS-JOURNAL-DOI`   | none          |
//! | `sequential`    | `NNNN-TIxx-CATEGORY-PROJECT`      | global        |
//! | `year_based`    | `YYYY-NNN-TIxx-CATEGORY-PROJECT`  | per year      |
//! | `project_first` | `PROJECT-CATEGORY-NNN-TIxx`       | per project   |
//! | `simple`        | `CATEGORY-PROJECT-NNN`            | per project   |

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  paper::{Field, PaperFields},
};

/// Components longer than this are truncated.
pub const MAX_COMPONENT_LEN: usize = 20;

/// Separator placed between words inside one component.
const WORD_SEP: char = '_';

/// Separator placed between components.
const TOKEN_SEP: char = '-';

// ─── Schemes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
  #[default]
  Hierarchical,
  Sequential,
  YearBased,
  ProjectFirst,
  Simple,
}

/// The set of records a sequence counter is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
  Global,
  Year(i32),
  Project(String),
}

impl NamingScheme {
  pub const ALL: [NamingScheme; 5] = [
    NamingScheme::Hierarchical,
    NamingScheme::Sequential,
    NamingScheme::YearBased,
    NamingScheme::ProjectFirst,
    NamingScheme::Simple,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      NamingScheme::Hierarchical => "hierarchical",
      NamingScheme::Sequential => "sequential",
      NamingScheme::YearBased => "year_based",
      NamingScheme::ProjectFirst => "project_first",
      NamingScheme::Simple => "simple",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      NamingScheme::Hierarchical => "Year, title tag, authors, journal and DOI (2023-PRKS-SMITH-NATURE-12345)",
      NamingScheme::Sequential => "Global counter, title tag, category and project (0001-PRKS-BRNG-SYEL)",
      NamingScheme::YearBased => "Year, per-year counter, title tag, category and project (2023-001-PRKS-BRNG-SYEL)",
      NamingScheme::ProjectFirst => "Project, category, per-project counter and title tag (SYEL-BRNG-001-PRKS)",
      NamingScheme::Simple => "Category, project and per-project counter (BRNG-SYEL-001)",
    }
  }

  /// Fields whose change forces the name to be recomputed.
  pub fn constituents(self) -> &'static [Field] {
    match self {
      NamingScheme::Hierarchical => {
        &[Field::Year, Field::Title, Field::Authors, Field::Journal, Field::Doi]
      }
      NamingScheme::Sequential => &[Field::Title, Field::Category, Field::Project],
      NamingScheme::YearBased => &[Field::Year, Field::Title, Field::Category, Field::Project],
      NamingScheme::ProjectFirst => &[Field::Project, Field::Category, Field::Title],
      NamingScheme::Simple => &[Field::Category, Field::Project],
    }
  }

  pub fn uses_sequence(self) -> bool { self != NamingScheme::Hierarchical }

  /// Zero-padding width of the sequence token.
  fn sequence_width(self) -> usize {
    match self {
      NamingScheme::Sequential => 4,
      _ => 3,
    }
  }

  /// Position of the sequence token among the `-`-separated tokens, and the
  /// total token count of a well-formed name.
  fn sequence_slot(self) -> Option<(usize, usize)> {
    match self {
      NamingScheme::Hierarchical => None,
      NamingScheme::Sequential => Some((0, 4)),
      NamingScheme::YearBased => Some((1, 5)),
      NamingScheme::ProjectFirst => Some((2, 4)),
      NamingScheme::Simple => Some((2, 3)),
    }
  }

  /// The counter partition `fields` falls into, or `None` when the scheme
  /// has no counter or the partition key is missing.
  pub fn partition(self, fields: &PaperFields) -> Option<Partition> {
    match self {
      NamingScheme::Hierarchical => None,
      NamingScheme::Sequential => Some(Partition::Global),
      NamingScheme::YearBased => {
        fields.year.filter(|y| (1000..=9999).contains(y)).map(Partition::Year)
      }
      NamingScheme::ProjectFirst | NamingScheme::Simple => fields
        .project
        .as_deref()
        .filter(|p| clean_component(p).is_some())
        .map(|p| Partition::Project(p.to_owned())),
    }
  }

  /// Extract the sequence number from a name produced by this scheme.
  pub fn sequence_of(self, unique_name: &str) -> Option<u32> {
    let (slot, count) = self.sequence_slot()?;
    let tokens: Vec<&str> = unique_name.split(TOKEN_SEP).collect();
    if tokens.len() != count {
      return None;
    }
    let token = tokens[slot];
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }
    token.parse().ok()
  }

  /// Generate the unique name for `fields`.
  ///
  /// `sequence` is ignored by `hierarchical` and defaults to 1 for the
  /// counter-based schemes. Returns an empty string when any required field
  /// is missing.
  pub fn generate(self, fields: &PaperFields, sequence: Option<u32>) -> String {
    self.tokens(fields, sequence).map(|t| t.join("-")).unwrap_or_default()
  }

  fn tokens(self, fields: &PaperFields, sequence: Option<u32>) -> Option<Vec<String>> {
    let seq = format!("{:0width$}", sequence.unwrap_or(1), width = self.sequence_width());
    let category = || fields.category.as_deref().and_then(clean_component);
    let project = || fields.project.as_deref().and_then(clean_component);
    let tokens = match self {
      NamingScheme::Hierarchical => vec![
        year_token(fields.year)?,
        title_tag(&fields.title)?,
        clean_component(&fields.authors)?,
        clean_component(&fields.journal)?,
        clean_component(&fields.doi)?,
      ],
      NamingScheme::Sequential => vec![seq, title_tag(&fields.title)?, category()?, project()?],
      NamingScheme::YearBased => vec![
        year_token(fields.year)?,
        seq,
        title_tag(&fields.title)?,
        category()?,
        project()?,
      ],
      NamingScheme::ProjectFirst => vec![project()?, category()?, seq, title_tag(&fields.title)?],
      NamingScheme::Simple => vec![category()?, project()?, seq],
    };
    Some(tokens)
  }

  /// Whether `unique_name` has the shape this scheme produces.
  pub fn matches(self, unique_name: &str) -> bool {
    let tokens: Vec<&str> = unique_name.split(TOKEN_SEP).collect();
    if tokens.iter().any(|t| t.is_empty()) {
      return false;
    }
    let is_year = |t: &str| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit());
    let is_tag = |t: &str| t.len() == 4 && t.chars().all(|c| c.is_alphabetic() && !c.is_lowercase());
    match self {
      NamingScheme::Hierarchical => tokens.len() == 5 && is_year(tokens[0]) && is_tag(tokens[1]),
      NamingScheme::Sequential => self.sequence_of(unique_name).is_some() && is_tag(tokens[1]),
      NamingScheme::YearBased => {
        self.sequence_of(unique_name).is_some() && is_year(tokens[0]) && is_tag(tokens[2])
      }
      NamingScheme::ProjectFirst => self.sequence_of(unique_name).is_some() && is_tag(tokens[3]),
      NamingScheme::Simple => self.sequence_of(unique_name).is_some(),
    }
  }
}

impl fmt::Display for NamingScheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for NamingScheme {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
    NamingScheme::ALL
      .into_iter()
      .find(|scheme| scheme.as_str() == wanted)
      .ok_or_else(|| Error::UnknownScheme(s.to_owned()))
  }
}

/// Every scheme's name for `fields`, in [`NamingScheme::ALL`] order.
pub fn preview(fields: &PaperFields, sequence: Option<u32>) -> Vec<(NamingScheme, String)> {
  NamingScheme::ALL
    .into_iter()
    .map(|scheme| (scheme, scheme.generate(fields, sequence)))
    .collect()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

fn year_token(year: Option<i32>) -> Option<String> {
  year.filter(|y| (1000..=9999).contains(y)).map(|y| y.to_string())
}

/// First two and last two letters of `title`, uppercased.
///
/// Non-letters are discarded first; fewer than two letters yields `None`.
pub fn title_tag(title: &str) -> Option<String> {
  let letters: Vec<char> = title
    .chars()
    .filter(|c| c.is_alphabetic())
    .flat_map(char::to_uppercase)
    .collect();
  if letters.len() < 2 {
    return None;
  }
  let mut tag: String = letters[..2].iter().collect();
  tag.extend(&letters[letters.len() - 2..]);
  Some(tag)
}

/// Uppercase `raw`, collapse every run of whitespace or punctuation into a
/// single `_`, and cap the result at [`MAX_COMPONENT_LEN`] characters.
pub fn clean_component(raw: &str) -> Option<String> {
  let mut out = String::new();
  let mut pending_sep = false;
  for c in raw.trim().chars() {
    if c.is_alphanumeric() {
      if pending_sep && !out.is_empty() {
        out.push(WORD_SEP);
      }
      pending_sep = false;
      out.extend(c.to_uppercase());
    } else {
      pending_sep = true;
    }
  }
  let truncated: String = out.chars().take(MAX_COMPONENT_LEN).collect();
  let truncated = truncated.trim_end_matches(WORD_SEP);
  (!truncated.is_empty()).then(|| truncated.to_owned())
}
