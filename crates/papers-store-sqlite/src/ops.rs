//! Statement helpers run inside connection closures.
//!
//! Every function takes a plain [`Connection`]; callers pass a
//! [`rusqlite::Transaction`] (which derefs to one) whenever more than one
//! statement must be atomic.

use std::collections::{BTreeMap, HashMap};

use papers_core::{
  naming::{NamingScheme, Partition},
  paper::{NewPaper, PaperFields},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::encode::{PAPER_COLUMNS, RawPaper};

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn fetch_paper(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawPaper>> {
  conn
    .query_row(
      &format!("SELECT {PAPER_COLUMNS} FROM papers p WHERE p.id = ?1"),
      [id],
      RawPaper::from_row,
    )
    .optional()
}

/// Every paper matching `filter` (an SQL condition on alias `p`), by id.
pub fn fetch_papers_where(
  conn: &Connection,
  filter: &str,
  args: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawPaper>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {PAPER_COLUMNS} FROM papers p WHERE {filter} ORDER BY p.id"))?;
  let rows = stmt.query_map(args, RawPaper::from_row)?;
  rows.collect()
}

pub fn load_extras(conn: &Connection, id: i64) -> rusqlite::Result<BTreeMap<String, String>> {
  let mut stmt = conn.prepare_cached("SELECT name, value FROM paper_extras WHERE paper_id = ?1")?;
  let rows = stmt.query_map([id], |r| Ok((r.get(0)?, r.get(1)?)))?;
  rows.collect()
}

/// Attach extension fields to each raw row.
pub fn with_extras(
  conn: &Connection,
  rows: Vec<RawPaper>,
) -> rusqlite::Result<Vec<(RawPaper, BTreeMap<String, String>)>> {
  rows
    .into_iter()
    .map(|raw| {
      let extras = load_extras(conn, raw.id)?;
      Ok((raw, extras))
    })
    .collect()
}

// ─── Unique names ────────────────────────────────────────────────────────────

/// One past the highest sequence number `scheme` has issued in `partition`.
pub fn next_sequence(
  conn: &Connection,
  scheme: NamingScheme,
  partition: &Partition,
) -> rusqlite::Result<u32> {
  let names: Vec<String> = match partition {
    Partition::Global => {
      let mut stmt = conn.prepare("SELECT unique_name FROM papers WHERE unique_name != ''")?;
      stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?
    }
    Partition::Year(year) => {
      let mut stmt =
        conn.prepare("SELECT unique_name FROM papers WHERE unique_name != '' AND year = ?1")?;
      stmt.query_map([year], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?
    }
    Partition::Project(project) => {
      let mut stmt =
        conn.prepare("SELECT unique_name FROM papers WHERE unique_name != '' AND project = ?1")?;
      stmt.query_map([project], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?
    }
  };
  let highest = names.iter().filter_map(|n| scheme.sequence_of(n)).max().unwrap_or(0);
  Ok(highest + 1)
}

/// Highest sequence number issued per partition within one transaction.
///
/// Only the first name in a partition scans the table; later ones count on
/// from the cached value. Valid only while every name written in the
/// transaction goes through the same instance.
#[derive(Debug, Default)]
pub struct Sequences(HashMap<Partition, u32>);

impl Sequences {
  fn next(
    &mut self,
    conn: &Connection,
    scheme: NamingScheme,
    partition: &Partition,
  ) -> rusqlite::Result<u32> {
    match self.0.get(partition) {
      Some(last) => Ok(last + 1),
      None => next_sequence(conn, scheme, partition),
    }
  }

  fn issued(&mut self, partition: Partition, sequence: u32) { self.0.insert(partition, sequence); }
}

/// Compute the unique name for `fields`.
///
/// `previous` is the record's current name and fields when it is being
/// updated: a record that stays in the same counter partition keeps its
/// sequence number.
pub fn assign_name(
  conn: &Connection,
  sequences: &mut Sequences,
  scheme: NamingScheme,
  fields: &PaperFields,
  previous: Option<(&str, &PaperFields)>,
) -> rusqlite::Result<String> {
  let Some(partition) = scheme.partition(fields) else {
    return Ok(scheme.generate(fields, None));
  };
  let kept = previous.and_then(|(name, old)| {
    (scheme.partition(old).as_ref() == Some(&partition))
      .then(|| scheme.sequence_of(name))
      .flatten()
  });
  if let Some(seq) = kept {
    return Ok(scheme.generate(fields, Some(seq)));
  }
  let sequence = sequences.next(conn, scheme, &partition)?;
  let name = scheme.generate(fields, Some(sequence));
  if !name.is_empty() {
    sequences.issued(partition, sequence);
  }
  Ok(name)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Insert `paper` with a freshly assigned unique name. Returns the new id
/// and the name.
pub fn insert_paper(
  conn: &Connection,
  sequences: &mut Sequences,
  scheme: NamingScheme,
  paper: &NewPaper,
  now: &str,
) -> rusqlite::Result<(i64, String)> {
  let f = &paper.fields;
  let unique_name = assign_name(conn, sequences, scheme, f, None)?;
  conn.execute(
    "INSERT INTO papers (title, authors, year, journal, doi, url, abstract, keywords, tags,
                         notes, status, pdf, category, project, unique_name, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
    params![
      f.title,
      f.authors,
      f.year,
      f.journal,
      f.doi,
      f.url,
      f.r#abstract,
      f.keywords,
      f.tags,
      f.notes,
      f.status,
      f.pdf,
      f.category,
      f.project,
      unique_name,
      now,
    ],
  )?;
  let id = conn.last_insert_rowid();
  write_extras(conn, id, &paper.extras)?;
  Ok((id, unique_name))
}

/// Overwrite every stored field of paper `id`.
pub fn update_paper(
  conn: &Connection,
  id: i64,
  f: &PaperFields,
  unique_name: &str,
  now: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE papers SET title = ?1, authors = ?2, year = ?3, journal = ?4, doi = ?5, url = ?6,
                       abstract = ?7, keywords = ?8, tags = ?9, notes = ?10, status = ?11,
                       pdf = ?12, category = ?13, project = ?14, unique_name = ?15,
                       updated_at = ?16
     WHERE id = ?17",
    params![
      f.title,
      f.authors,
      f.year,
      f.journal,
      f.doi,
      f.url,
      f.r#abstract,
      f.keywords,
      f.tags,
      f.notes,
      f.status,
      f.pdf,
      f.category,
      f.project,
      unique_name,
      now,
      id,
    ],
  )?;
  Ok(())
}

/// Upsert extension fields; an empty value removes the field.
pub fn write_extras(
  conn: &Connection,
  id: i64,
  extras: &BTreeMap<String, String>,
) -> rusqlite::Result<()> {
  let mut upsert = conn.prepare_cached(
    "INSERT INTO paper_extras (paper_id, name, value) VALUES (?1, ?2, ?3)
     ON CONFLICT (paper_id, name) DO UPDATE SET value = excluded.value",
  )?;
  let mut remove =
    conn.prepare_cached("DELETE FROM paper_extras WHERE paper_id = ?1 AND name = ?2")?;
  for (name, value) in extras {
    let value = value.trim();
    if value.is_empty() {
      remove.execute(params![id, name])?;
    } else {
      upsert.execute(params![id, name, value])?;
    }
  }
  Ok(())
}

/// The extension fields a fresh insert of `extras` leaves in the table.
pub fn stored_extras(extras: &BTreeMap<String, String>) -> BTreeMap<String, String> {
  extras
    .iter()
    .map(|(name, value)| (name, value.trim()))
    .filter(|(_, value)| !value.is_empty())
    .map(|(name, value)| (name.clone(), value.to_owned()))
    .collect()
}
