//! Category and project lookups.
//!
//! Both are classification buckets identified by a four-character code.
//! Papers reference them by code; the association is not enforced.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, paper::Field};

/// Length of every lookup code.
pub const CODE_LEN: usize = 4;

const CODE_PAD: char = 'X';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
  Category,
  Project,
}

impl LookupKind {
  pub fn as_str(self) -> &'static str {
    match self {
      LookupKind::Category => "category",
      LookupKind::Project => "project",
    }
  }

  /// The paper field holding references to this kind.
  pub fn field(self) -> Field {
    match self {
      LookupKind::Category => Field::Category,
      LookupKind::Project => Field::Project,
    }
  }
}

impl fmt::Display for LookupKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for LookupKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "category" | "categories" => Ok(LookupKind::Category),
      "project" | "projects" => Ok(LookupKind::Project),
      _ => Err(Error::UnknownLookupKind(s.to_owned())),
    }
  }
}

/// What deleting a lookup that papers still reference does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
  /// Refuse while any paper references the code.
  #[default]
  Restrict,
  /// Clear the reference on every paper, then delete.
  ClearReferences,
}

impl DeletePolicy {
  pub fn as_str(self) -> &'static str {
    match self {
      DeletePolicy::Restrict => "restrict",
      DeletePolicy::ClearReferences => "clear_references",
    }
  }
}

impl fmt::Display for DeletePolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for DeletePolicy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
      "restrict" => Ok(DeletePolicy::Restrict),
      "clear_references" | "clear" | "cascade" => Ok(DeletePolicy::ClearReferences),
      _ => Err(Error::UnknownDeletePolicy(s.to_owned())),
    }
  }
}

/// A persisted category or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
  pub kind:        LookupKind,
  pub code:        String,
  pub name:        String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

/// Input for creating a lookup. Without an explicit code one is derived
/// from the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLookup {
  pub name:        String,
  pub code:        Option<String>,
  pub description: String,
}

impl NewLookup {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }
}

// ─── Starter sets ────────────────────────────────────────────────────────────

const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
  ("BRNG", "Braining", "Brain-related research and studies"),
  ("FE35", "Fellowship i3S", "Fellowship research at i3S institute"),
  ("PHHD", "PhD", "PhD thesis research"),
  ("OTER", "Other", "Other types of research"),
];

const DEFAULT_PROJECTS: &[(&str, &str, &str)] = &[
  (
    "SYEL",
    "Systematic Review + ML Model",
    "Rationale for model development (inputs, outputs and architecture)",
  ),
  (
    "IBON",
    "Ibidi Perfusion",
    "Figure out flow and seeding conditions for microfluidics 3D perfusion",
  ),
  ("CANG", "Cardiac Bioprinting", "Figure out best bioprinting practices for cardiac tissue"),
  ("AING", "AI in Bioprinting", "Use of AI in bioprinting to scale it"),
  ("SCNG", "Scaling Bioprinting", "Approaches to scale bioprinted constructs"),
  ("CALS", "Cardiac Models", "Study and develop cardiac 3D models"),
  ("CAGY", "Cardiomyocyte Biology", "How CM's biology lets us achieve upscaled models"),
  ("AITS", "AI Agents", "AI Agents research"),
  ("AGLS", "Ageing Cardiac Models", "How we can study and mimic ageing in cardiac models"),
  ("JOLN", "Journal Club - MERLN", "Journal Club Meetings @ MERLN"),
];

/// The starter entries a new database can be seeded with, all with
/// explicit codes.
pub fn defaults(kind: LookupKind) -> Vec<NewLookup> {
  let table = match kind {
    LookupKind::Category => DEFAULT_CATEGORIES,
    LookupKind::Project => DEFAULT_PROJECTS,
  };
  table
    .iter()
    .map(|&(code, name, description)| NewLookup {
      name:        name.to_owned(),
      code:        Some(code.to_owned()),
      description: description.to_owned(),
    })
    .collect()
}

// ─── Codes ───────────────────────────────────────────────────────────────────

/// Derive the preferred code for `name`: first two and last two letters,
/// uppercased, padded with `X` when the name has fewer than two letters.
pub fn base_code(name: &str) -> String {
  let letters: Vec<char> = name
    .chars()
    .filter(|c| c.is_ascii_alphabetic())
    .map(|c| c.to_ascii_uppercase())
    .collect();
  if letters.len() < 2 {
    let mut code: String = letters.into_iter().collect();
    while code.len() < CODE_LEN {
      code.push(CODE_PAD);
    }
    return code;
  }
  let mut code: String = letters[..2].iter().collect();
  code.extend(&letters[letters.len() - 2..]);
  code
}

/// Return `base` if free, otherwise replace its tail with the smallest
/// counter (from 2) that yields a free code of the same length.
pub fn disambiguate(base: &str, taken: impl Fn(&str) -> bool) -> Option<String> {
  if !taken(base) {
    return Some(base.to_owned());
  }
  (2..10usize.pow(CODE_LEN as u32 - 1)).find_map(|n| {
    let suffix = n.to_string();
    let keep = CODE_LEN - suffix.len();
    let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
    (!taken(&candidate)).then_some(candidate)
  })
}

/// Normalize a user-supplied code, rejecting anything but four ASCII
/// alphanumerics.
pub fn validate_code(raw: &str) -> Result<String> {
  let code = raw.trim().to_ascii_uppercase();
  if code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
    Ok(code)
  } else {
    Err(Error::InvalidCode(raw.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base_codes() {
    assert_eq!(base_code("Cardiac Bioprinting"), "CANG");
    assert_eq!(base_code("PhD"), "PHHD");
    assert_eq!(base_code("AI"), "AIAI");
    assert_eq!(base_code("Q"), "QXXX");
    assert_eq!(base_code("42"), "XXXX");
  }

  #[test]
  fn collisions_get_a_counter() {
    let taken = ["CANG", "CAN2"];
    let code = disambiguate("CANG", |c| taken.contains(&c)).unwrap();
    assert_eq!(code, "CAN3");
    assert_eq!(disambiguate("AGLS", |_| false).unwrap(), "AGLS");
  }

  #[test]
  fn counter_keeps_code_length() {
    let code = disambiguate("ABCD", |c| c == "ABCD" || (c.starts_with("ABC") && c != "ABC9")).unwrap();
    assert_eq!(code, "ABC9");
    let code = disambiguate("ABCD", |c| c.starts_with("ABC") || c == "AB10").unwrap();
    assert_eq!(code, "AB11");
  }

  #[test]
  fn default_codes_are_valid_and_distinct() {
    for kind in [LookupKind::Category, LookupKind::Project] {
      let seeds = defaults(kind);
      let codes: std::collections::HashSet<_> =
        seeds.iter().filter_map(|l| l.code.as_deref()).collect();
      assert_eq!(codes.len(), seeds.len(), "{kind}");
      for code in codes {
        assert_eq!(validate_code(code).unwrap(), code);
      }
    }
    assert_eq!(defaults(LookupKind::Category)[0].name, "Braining");
    assert_eq!(defaults(LookupKind::Project).len(), 10);
  }

  #[test]
  fn explicit_codes_are_validated() {
    assert_eq!(validate_code(" syel ").unwrap(), "SYEL");
    assert_eq!(validate_code("FE35").unwrap(), "FE35");
    assert!(validate_code("TOOLONG").is_err());
    assert!(validate_code("A-BC").is_err());
  }

  #[test]
  fn kinds_and_policies_parse() {
    assert_eq!("Projects".parse::<LookupKind>().unwrap(), LookupKind::Project);
    assert_eq!(
      "clear-references".parse::<DeletePolicy>().unwrap(),
      DeletePolicy::ClearReferences
    );
    assert!("maybe".parse::<DeletePolicy>().is_err());
  }
}
