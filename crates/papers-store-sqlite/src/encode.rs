//! Conversions between domain types and their SQLite column forms.
//!
//! Timestamps are stored as RFC 3339 strings. Rows are first read into
//! plain `Raw*` structs inside the connection closure, then decoded into
//! domain types on the async side.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use papers_core::{
  lookup::{Lookup, LookupKind},
  paper::{Paper, PaperFields, PaperId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

pub fn lookup_table(kind: LookupKind) -> &'static str {
  match kind {
    LookupKind::Category => "categories",
    LookupKind::Project => "projects",
  }
}

/// The `papers` column holding references to `kind`.
pub fn lookup_column(kind: LookupKind) -> &'static str { kind.field().as_str() }

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Select list matching [`RawPaper::from_row`], for a `papers p` alias.
pub const PAPER_COLUMNS: &str = "p.id, p.title, p.authors, p.year, p.journal, p.doi, p.url, \
   p.abstract, p.keywords, p.tags, p.notes, p.status, p.pdf, p.category, p.project, \
   p.unique_name, p.created_at, p.updated_at";

/// A `papers` row as stored.
#[derive(Debug, Clone)]
pub struct RawPaper {
  pub id:          i64,
  pub fields:      PaperFields,
  pub unique_name: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPaper {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      fields:      PaperFields {
        title:      row.get(1)?,
        authors:    row.get(2)?,
        year:       row.get(3)?,
        journal:    row.get(4)?,
        doi:        row.get(5)?,
        url:        row.get(6)?,
        r#abstract: row.get(7)?,
        keywords:   row.get(8)?,
        tags:       row.get(9)?,
        notes:      row.get(10)?,
        status:     row.get(11)?,
        pdf:        row.get(12)?,
        category:   row.get(13)?,
        project:    row.get(14)?,
      },
      unique_name: row.get(15)?,
      created_at:  row.get(16)?,
      updated_at:  row.get(17)?,
    })
  }

  pub fn into_paper(self, extras: BTreeMap<String, String>) -> Result<Paper> {
    Ok(Paper {
      id: PaperId(self.id),
      fields: self.fields,
      extras,
      unique_name: self.unique_name,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// A `categories` or `projects` row as stored.
#[derive(Debug, Clone)]
pub struct RawLookup {
  pub code:        String,
  pub name:        String,
  pub description: String,
  pub created_at:  String,
}

impl RawLookup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      code:        row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_lookup(self, kind: LookupKind) -> Result<Lookup> {
    Ok(Lookup {
      kind,
      code: self.code,
      name: self.name,
      description: self.description,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_survive_storage() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
