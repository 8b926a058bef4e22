//! SQL schema for the papers SQLite store.
//!
//! Tables are versioned through `PRAGMA user_version`: on open every entry of
//! [`MIGRATIONS`] past the stored version runs in its own transaction. The
//! full-text index is created separately because the SQLite build may lack
//! FTS5; without it the store falls back to substring search, which
//! compares text through the [`FOLD`] function.

use rusqlite::{Connection, OptionalExtension as _, functions::FunctionFlags};

/// Scalar SQL function lowercasing its argument with full Unicode case
/// mapping. SQLite's own `lower()` and `LIKE` only fold ASCII.
pub const FOLD: &str = "fold";

/// Per-connection settings. Not transactional, so run before migrating.
const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

const V1: &str = "
CREATE TABLE IF NOT EXISTS papers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL DEFAULT '',
    authors     TEXT NOT NULL DEFAULT '',
    year        INTEGER,
    journal     TEXT NOT NULL DEFAULT '',
    doi         TEXT NOT NULL DEFAULT '',
    url         TEXT NOT NULL DEFAULT '',
    abstract    TEXT NOT NULL DEFAULT '',
    keywords    TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '',
    notes       TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT '',
    pdf         TEXT NOT NULL DEFAULT '',
    category    TEXT,             -- lookup code, not enforced
    project     TEXT,             -- lookup code, not enforced
    unique_name TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,    -- RFC 3339 UTC
    updated_at  TEXT NOT NULL
);

-- Spreadsheet columns outside the well-known field set.
CREATE TABLE IF NOT EXISTS paper_extras (
    paper_id INTEGER NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
    name     TEXT NOT NULL,
    value    TEXT NOT NULL,
    PRIMARY KEY (paper_id, name)
);

CREATE TABLE IF NOT EXISTS categories (
    code        TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    code        TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS papers_year_idx        ON papers(year);
CREATE INDEX IF NOT EXISTS papers_journal_idx     ON papers(journal);
CREATE INDEX IF NOT EXISTS papers_unique_name_idx ON papers(unique_name);
CREATE INDEX IF NOT EXISTS papers_category_idx    ON papers(category);
CREATE INDEX IF NOT EXISTS papers_project_idx     ON papers(project);
";

/// Schema steps, applied in order. Index `i` brings the database to
/// `user_version = i + 1`.
pub const MIGRATIONS: &[&str] = &[V1];

/// External-content FTS5 index over the searchable columns, kept in sync by
/// triggers.
const FTS: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS papers_fts USING fts5(
    title, authors, journal, abstract, keywords, tags, notes,
    content='papers', content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS papers_fts_insert AFTER INSERT ON papers BEGIN
    INSERT INTO papers_fts(rowid, title, authors, journal, abstract, keywords, tags, notes)
    VALUES (new.id, new.title, new.authors, new.journal, new.abstract, new.keywords, new.tags, new.notes);
END;

CREATE TRIGGER IF NOT EXISTS papers_fts_delete AFTER DELETE ON papers BEGIN
    INSERT INTO papers_fts(papers_fts, rowid, title, authors, journal, abstract, keywords, tags, notes)
    VALUES ('delete', old.id, old.title, old.authors, old.journal, old.abstract, old.keywords, old.tags, old.notes);
END;

CREATE TRIGGER IF NOT EXISTS papers_fts_update AFTER UPDATE ON papers BEGIN
    INSERT INTO papers_fts(papers_fts, rowid, title, authors, journal, abstract, keywords, tags, notes)
    VALUES ('delete', old.id, old.title, old.authors, old.journal, old.abstract, old.keywords, old.tags, old.notes);
    INSERT INTO papers_fts(rowid, title, authors, journal, abstract, keywords, tags, notes)
    VALUES (new.id, new.title, new.authors, new.journal, new.abstract, new.keywords, new.tags, new.notes);
END;
";

/// Register the store's SQL functions on `conn`. Functions live on the
/// connection, not in the file, so this runs on every open.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    FOLD,
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| t.to_lowercase()))
    },
  )
}

/// Bring the schema up to the latest version.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
  conn.execute_batch(PRAGMAS)?;
  let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
  let applied = usize::try_from(version).unwrap_or(0);

  for (i, step) in MIGRATIONS.iter().enumerate().skip(applied) {
    let tx = conn.transaction()?;
    tx.execute_batch(step)?;
    tx.execute_batch(&format!("PRAGMA user_version = {};", i + 1))?;
    tx.commit()?;
    tracing::debug!(version = i + 1, "applied schema migration");
  }
  Ok(())
}

/// Whether the full-text index table exists in this database.
pub fn has_fts(conn: &Connection) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'papers_fts'",
        [],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Create the full-text index and its triggers.
///
/// Returns `false`, leaving the database untouched, when the SQLite build
/// cannot create FTS5 tables. A freshly created index over existing rows is
/// populated immediately.
pub fn ensure_fts(conn: &mut Connection) -> rusqlite::Result<bool> {
  let existed = has_fts(conn)?;
  let tx = conn.transaction()?;
  if let Err(e) = tx.execute_batch(FTS) {
    tracing::info!(error = %e, "full-text search unavailable; using substring matching");
    return Ok(false);
  }
  if !existed {
    tx.execute_batch("INSERT INTO papers_fts(papers_fts) VALUES ('rebuild');")?;
  }
  tx.commit()?;
  Ok(true)
}
