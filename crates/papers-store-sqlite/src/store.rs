//! [`SqliteStore`], the SQLite implementation of [`PaperStore`].

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  path::Path,
};

use chrono::{Duration, Utc};
use rusqlite::{OptionalExtension as _, params, params_from_iter, types::Value};

use papers_core::{
  lookup::{self, DeletePolicy, Lookup, LookupKind, NewLookup},
  naming::NamingScheme,
  paper::{Field, NewPaper, Paper, PaperId, PaperPatch},
  store::{NameChange, PaperStore, SearchBackend, SearchQuery, Stats, ValidationReport},
};

use crate::{
  Error, Result,
  encode::{PAPER_COLUMNS, RawLookup, RawPaper, encode_dt, lookup_column, lookup_table},
  ops, schema,
};

/// Years listed by [`PaperStore::stats`].
const STATS_YEARS: usize = 10;

/// Window for the "recent additions" figure.
const RECENT_DAYS: i64 = 7;

// ─── Options ─────────────────────────────────────────────────────────────────

/// Behaviour fixed for the lifetime of an open store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
  pub naming:        NamingScheme,
  pub delete_policy: DeletePolicy,
  /// Use the FTS5 index when the SQLite build supports it.
  pub full_text:     bool,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      naming:        NamingScheme::default(),
      delete_policy: DeletePolicy::default(),
      full_text:     true,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A papers store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  options: StoreOptions,
  backend: SearchBackend,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, options).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, options).await
  }

  async fn init(conn: tokio_rusqlite::Connection, options: StoreOptions) -> Result<Self> {
    let full_text = options.full_text;
    let indexed = conn
      .call(move |conn| {
        schema::register_functions(conn)?;
        schema::migrate(conn)?;
        let indexed = if full_text { schema::ensure_fts(conn)? } else { false };
        Ok(indexed)
      })
      .await?;
    let backend = if indexed { SearchBackend::FullText } else { SearchBackend::Substring };
    tracing::debug!(%backend, naming = %options.naming, "opened papers store");
    Ok(Self { conn, options, backend })
  }

  pub fn options(&self) -> StoreOptions { self.options }
}

// ─── Search SQL ──────────────────────────────────────────────────────────────

/// Quote every whitespace-separated term so user input is never parsed as
/// FTS5 query syntax. Terms are implicitly AND-ed.
fn fts_query(text: &str) -> String {
  text
    .split_whitespace()
    .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Build the SQL and positional arguments for `query`.
fn search_sql(query: &SearchQuery, backend: SearchBackend) -> (String, Vec<Value>) {
  let mut from = "papers p".to_owned();
  let mut conds: Vec<String> = Vec::new();
  let mut args: Vec<Value> = Vec::new();
  let mut order = "p.id";

  if let Some(text) = query.text_terms() {
    match backend {
      SearchBackend::FullText => {
        from.push_str(" JOIN papers_fts ON papers_fts.rowid = p.id");
        conds.push("papers_fts MATCH ?".to_owned());
        args.push(Value::Text(fts_query(text)));
        order = "papers_fts.rank, p.id";
      }
      SearchBackend::Substring => {
        // Literal containment on both sides folded the same way, so `%`
        // and `_` in the needle match only themselves.
        let needle = text.to_lowercase();
        let any = Field::SEARCHABLE
          .iter()
          .map(|f| format!("instr({}(p.{}), ?) > 0", schema::FOLD, f.as_str()))
          .collect::<Vec<_>>()
          .join(" OR ");
        conds.push(format!("({any})"));
        args.extend(Field::SEARCHABLE.iter().map(|_| Value::Text(needle.clone())));
      }
    }
  }

  if let Some(year) = query.year {
    conds.push("p.year = ?".to_owned());
    args.push(Value::Integer(year.into()));
  }
  let text_filters = [
    ("journal", &query.journal),
    ("category", &query.category),
    ("project", &query.project),
    ("status", &query.status),
  ];
  for (column, value) in text_filters {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
      conds.push(format!("p.{column} = ? COLLATE NOCASE"));
      args.push(Value::Text(value.to_owned()));
    }
  }

  let mut sql = format!("SELECT {PAPER_COLUMNS} FROM {from}");
  if !conds.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&conds.join(" AND "));
  }
  sql.push_str(&format!(" ORDER BY {order} LIMIT ?"));
  args.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
  (sql, args)
}

// ─── Closure outcomes ────────────────────────────────────────────────────────

/// Lookup outcomes that abort a transaction without being database errors.
enum Refusal {
  LookupNotFound,
  LookupInUse(usize),
  DuplicateName,
  DuplicateCode(String),
  CodesExhausted(String),
}

impl Refusal {
  fn into_error(self, kind: LookupKind, code: &str, name: &str) -> Error {
    match self {
      Refusal::LookupNotFound => Error::LookupNotFound { kind, code: code.to_owned() },
      Refusal::LookupInUse(papers) => Error::LookupInUse { kind, code: code.to_owned(), papers },
      Refusal::DuplicateName => Error::DuplicateLookupName { kind, name: name.to_owned() },
      Refusal::DuplicateCode(code) => Error::DuplicateLookupCode { kind, code },
      Refusal::CodesExhausted(base) => Error::CodesExhausted { kind, base },
    }
  }
}

// ─── PaperStore impl ─────────────────────────────────────────────────────────

impl PaperStore for SqliteStore {
  type Error = Error;

  fn naming_scheme(&self) -> NamingScheme { self.options.naming }

  fn search_backend(&self) -> SearchBackend { self.backend }

  // ── Papers ────────────────────────────────────────────────────────────

  async fn create(&self, input: NewPaper) -> Result<Paper> {
    let scheme = self.options.naming;
    let now = Utc::now();
    let now_str = encode_dt(now);
    let record = input.clone();

    let (id, unique_name) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut sequences = ops::Sequences::default();
        let created = ops::insert_paper(&tx, &mut sequences, scheme, &record, &now_str)?;
        tx.commit()?;
        Ok(created)
      })
      .await?;

    tracing::debug!(id, %unique_name, "created paper");
    Ok(Paper {
      id: PaperId(id),
      extras: ops::stored_extras(&input.extras),
      fields: input.fields,
      unique_name,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get(&self, id: PaperId) -> Result<Option<Paper>> {
    let row = self
      .conn
      .call(move |conn| {
        let Some(raw) = ops::fetch_paper(conn, id.0)? else {
          return Ok(None);
        };
        let extras = ops::load_extras(conn, raw.id)?;
        Ok(Some((raw, extras)))
      })
      .await?;
    row.map(|(raw, extras)| raw.into_paper(extras)).transpose()
  }

  async fn update(&self, id: PaperId, patch: PaperPatch) -> Result<Paper> {
    let scheme = self.options.naming;
    let now = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(raw) = ops::fetch_paper(&tx, id.0)? else {
          return Ok(None);
        };
        let mut fields = raw.fields.clone();
        let changed = patch.apply(&mut fields);
        let renamed = changed.iter().any(|f| scheme.constituents().contains(f));
        let unique_name = if renamed {
          let mut sequences = ops::Sequences::default();
          let previous = Some((raw.unique_name.as_str(), &raw.fields));
          ops::assign_name(&tx, &mut sequences, scheme, &fields, previous)?
        } else {
          raw.unique_name.clone()
        };
        ops::update_paper(&tx, id.0, &fields, &unique_name, &now)?;
        ops::write_extras(&tx, id.0, patch.extras())?;

        let extras = ops::load_extras(&tx, id.0)?;
        let stored = RawPaper { fields, unique_name, updated_at: now, ..raw };
        tx.commit()?;
        Ok(Some((stored, extras)))
      })
      .await?;

    let (raw, extras) = updated.ok_or(Error::PaperNotFound(id))?;
    tracing::debug!(id = raw.id, unique_name = %raw.unique_name, "updated paper");
    raw.into_paper(extras)
  }

  async fn delete<'a>(&'a self, ids: &'a [PaperId]) -> Result<usize> {
    let mut ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
    ids.sort_unstable();
    ids.dedup();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for &id in &ids {
          if tx.execute("DELETE FROM papers WHERE id = ?1", [id])? == 0 {
            return Ok(Err(PaperId(id)));
          }
        }
        tx.commit()?;
        Ok(Ok(ids.len()))
      })
      .await?;

    match outcome {
      Ok(deleted) => {
        tracing::info!(deleted, "deleted papers");
        Ok(deleted)
      }
      Err(missing) => Err(Error::PaperNotFound(missing)),
    }
  }

  async fn search<'a>(&'a self, query: &'a SearchQuery) -> Result<Vec<Paper>> {
    let (sql, args) = search_sql(query, self.backend);
    let rows = self
      .conn
      .call(move |conn| {
        let found = {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt.query_map(params_from_iter(args), RawPaper::from_row)?;
          rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(ops::with_extras(conn, found)?)
      })
      .await?;
    rows.into_iter().map(|(raw, extras)| raw.into_paper(extras)).collect()
  }

  async fn import(&self, papers: Vec<NewPaper>) -> Result<Vec<PaperId>> {
    let scheme = self.options.naming;
    let now = encode_dt(Utc::now());
    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(papers.len());
        let mut sequences = ops::Sequences::default();
        for paper in &papers {
          let (id, _) = ops::insert_paper(&tx, &mut sequences, scheme, paper, &now)?;
          ids.push(PaperId(id));
        }
        tx.commit()?;
        Ok(ids)
      })
      .await?;
    tracing::info!(imported = ids.len(), "imported papers");
    Ok(ids)
  }

  async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM papers", [], |r| r.get(0))?))
      .await?;
    Ok(n.try_into().unwrap_or(0))
  }

  async fn distinct_values(&self, field: Field) -> Result<Vec<String>> {
    let column = field.as_str();
    let sql = format!(
      "SELECT DISTINCT CAST({column} AS TEXT) AS v FROM papers
       WHERE v IS NOT NULL AND v != '' ORDER BY v"
    );
    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
      })
      .await?;
    Ok(values)
  }

  // ── Maintenance ───────────────────────────────────────────────────────

  async fn validate(&self) -> Result<ValidationReport> {
    let scheme = self.options.naming;
    let report = self
      .conn
      .call(move |conn| {
        let mut report = ValidationReport::default();

        let mut stmt = conn.prepare("SELECT id, unique_name FROM papers ORDER BY id")?;
        let names = stmt
          .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut by_name: BTreeMap<String, Vec<PaperId>> = BTreeMap::new();
        for (id, name) in names {
          if name.is_empty() {
            report.empty_unique_names.push(PaperId(id));
            continue;
          }
          if !scheme.matches(&name) {
            report.nonconforming_names.push(PaperId(id));
          }
          by_name.entry(name).or_default().push(PaperId(id));
        }
        by_name.retain(|_, ids| ids.len() > 1);
        report.duplicate_unique_names = by_name;

        for kind in [LookupKind::Category, LookupKind::Project] {
          let column = lookup_column(kind);
          let table = lookup_table(kind);
          let mut stmt = conn.prepare(&format!(
            "SELECT id, {column} FROM papers
             WHERE {column} IS NOT NULL AND {column} NOT IN (SELECT code FROM {table})
             ORDER BY id"
          ))?;
          let dangling = stmt
            .query_map([], |r| Ok((PaperId(r.get(0)?), kind, r.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          report.dangling_references.extend(dangling);
        }
        report.dangling_references.sort_by_key(|(id, ..)| *id);

        if schema::has_fts(conn)? {
          let papers: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |r| r.get(0))?;
          let indexed: i64 =
            conn.query_row("SELECT COUNT(*) FROM papers_fts_docsize", [], |r| r.get(0))?;
          if papers != indexed {
            report.index_mismatch =
              Some((papers.try_into().unwrap_or(0), indexed.try_into().unwrap_or(0)));
          }
        }
        Ok(report)
      })
      .await?;
    Ok(report)
  }

  async fn stats(&self) -> Result<Stats> {
    let cutoff = encode_dt(Utc::now() - Duration::days(RECENT_DAYS));
    let (total, by_year, recent) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |r| r.get(0))?;
        let mut stmt = conn.prepare(
          "SELECT year, COUNT(*) FROM papers WHERE year IS NOT NULL
           GROUP BY year ORDER BY year DESC LIMIT ?1",
        )?;
        let by_year = stmt
          .query_map([STATS_YEARS as i64], |r| Ok((r.get::<_, i32>(0)?, r.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let recent: i64 = conn.query_row(
          "SELECT COUNT(*) FROM papers WHERE created_at >= ?1",
          [&cutoff],
          |r| r.get(0),
        )?;
        Ok((total, by_year, recent))
      })
      .await?;

    Ok(Stats {
      total_records:    total.try_into().unwrap_or(0),
      by_year:          by_year
        .into_iter()
        .map(|(year, n)| (year, n.try_into().unwrap_or(0)))
        .collect(),
      recent_additions: recent.try_into().unwrap_or(0),
      backend:          self.backend,
    })
  }

  async fn rebuild_search_index(&self) -> Result<()> {
    let rebuilt = self
      .conn
      .call(|conn| {
        if !schema::has_fts(conn)? {
          return Ok(false);
        }
        conn.execute_batch("INSERT INTO papers_fts(papers_fts) VALUES ('rebuild');")?;
        Ok(true)
      })
      .await?;
    if rebuilt {
      tracing::info!("rebuilt full-text index");
    }
    Ok(())
  }

  async fn regenerate_names(&self, scheme: NamingScheme, apply: bool) -> Result<Vec<NameChange>> {
    let now = encode_dt(Utc::now());
    let changes = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let rows = ops::fetch_papers_where(&tx, "1", [])?;

        let mut counters: HashMap<_, u32> = HashMap::new();
        let mut changes = Vec::with_capacity(rows.len());
        for raw in rows {
          let new_name = match scheme.partition(&raw.fields) {
            None => scheme.generate(&raw.fields, None),
            Some(partition) => {
              let next = counters.get(&partition).copied().unwrap_or(0) + 1;
              let name = scheme.generate(&raw.fields, Some(next));
              if !name.is_empty() {
                counters.insert(partition, next);
              }
              name
            }
          };
          changes.push(NameChange {
            id: PaperId(raw.id),
            title: raw.fields.title,
            old_name: raw.unique_name,
            new_name,
          });
        }

        if apply {
          let mut stmt =
            tx.prepare("UPDATE papers SET unique_name = ?1, updated_at = ?2 WHERE id = ?3")?;
          for change in changes.iter().filter(|c| c.is_change()) {
            stmt.execute(params![change.new_name, now, change.id.0])?;
          }
          drop(stmt);
          tx.commit()?;
        }
        Ok(changes)
      })
      .await?;

    if apply {
      let renamed = changes.iter().filter(|c| c.is_change()).count();
      tracing::info!(%scheme, renamed, "regenerated unique names");
    }
    Ok(changes)
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  async fn add_lookup(&self, kind: LookupKind, input: NewLookup) -> Result<Lookup> {
    let name = input.name.trim().to_owned();
    if name.is_empty() {
      return Err(papers_core::Error::EmptyLookupName.into());
    }
    let explicit = input.code.as_deref().map(lookup::validate_code).transpose()?;
    let description = input.description.trim().to_owned();
    let now = Utc::now();
    let created_at = encode_dt(now);
    let table = lookup_table(kind);

    let lookup_name = name.clone();
    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let clash: Option<String> = tx
          .query_row(
            &format!("SELECT code FROM {table} WHERE name = ?1 COLLATE NOCASE"),
            [&lookup_name],
            |r| r.get(0),
          )
          .optional()?;
        if clash.is_some() {
          return Ok(Err(Refusal::DuplicateName));
        }

        let taken: HashSet<String> = {
          let mut stmt = tx.prepare(&format!("SELECT code FROM {table}"))?;
          stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?
        };
        let code = match explicit {
          Some(code) if taken.contains(&code) => return Ok(Err(Refusal::DuplicateCode(code))),
          Some(code) => code,
          None => {
            let base = lookup::base_code(&lookup_name);
            match lookup::disambiguate(&base, |c| taken.contains(c)) {
              Some(code) => code,
              None => return Ok(Err(Refusal::CodesExhausted(base))),
            }
          }
        };

        tx.execute(
          &format!(
            "INSERT INTO {table} (code, name, description, created_at) VALUES (?1, ?2, ?3, ?4)"
          ),
          params![code, lookup_name, description, created_at],
        )?;
        tx.commit()?;
        Ok(Ok(RawLookup { code, name: lookup_name, description, created_at }))
      })
      .await?;

    let raw = result.map_err(|refusal| refusal.into_error(kind, "", &name))?;
    tracing::info!(%kind, code = %raw.code, name = %raw.name, "added lookup");
    raw.into_lookup(kind)
  }

  async fn seed_lookups(&self, kind: LookupKind) -> Result<usize> {
    let table = lookup_table(kind);
    let seeds = lookup::defaults(kind);
    let created_at = encode_dt(Utc::now());
    let added = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Both the code and the name are unique, so either clash skips.
        let mut insert = tx.prepare(&format!(
          "INSERT OR IGNORE INTO {table} (code, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)"
        ))?;
        let mut added = 0;
        for seed in &seeds {
          added += insert.execute(params![seed.code, seed.name, seed.description, created_at])?;
        }
        drop(insert);
        tx.commit()?;
        Ok(added)
      })
      .await?;
    tracing::info!(%kind, added, "seeded default lookups");
    Ok(added)
  }

  async fn list_lookups(&self, kind: LookupKind) -> Result<Vec<Lookup>> {
    let sql = format!(
      "SELECT code, name, description, created_at FROM {} ORDER BY name COLLATE NOCASE",
      lookup_table(kind)
    );
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], RawLookup::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
      })
      .await?;
    rows.into_iter().map(|raw| raw.into_lookup(kind)).collect()
  }

  async fn update_lookup(
    &self,
    kind: LookupKind,
    code: String,
    name: String,
    description: String,
  ) -> Result<Lookup> {
    let code = code.trim().to_uppercase();
    let name = name.trim().to_owned();
    if name.is_empty() {
      return Err(papers_core::Error::EmptyLookupName.into());
    }
    let table = lookup_table(kind);
    let (key, new_name) = (code.clone(), name.clone());

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let clash: Option<String> = tx
          .query_row(
            &format!("SELECT code FROM {table} WHERE name = ?1 COLLATE NOCASE AND code != ?2"),
            [&new_name, &key],
            |r| r.get(0),
          )
          .optional()?;
        if clash.is_some() {
          return Ok(Err(Refusal::DuplicateName));
        }
        let updated = tx.execute(
          &format!("UPDATE {table} SET name = ?1, description = ?2 WHERE code = ?3"),
          params![new_name, description.trim(), key],
        )?;
        if updated == 0 {
          return Ok(Err(Refusal::LookupNotFound));
        }
        let raw = tx.query_row(
          &format!("SELECT code, name, description, created_at FROM {table} WHERE code = ?1"),
          [&key],
          RawLookup::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    let raw = result.map_err(|refusal| refusal.into_error(kind, &code, &name))?;
    tracing::info!(%kind, code = %raw.code, "updated lookup");
    raw.into_lookup(kind)
  }

  async fn delete_lookup(&self, kind: LookupKind, code: String) -> Result<usize> {
    let code = code.trim().to_uppercase();
    let scheme = self.options.naming;
    let policy = self.options.delete_policy;
    let table = lookup_table(kind);
    let column = lookup_column(kind);
    let field = kind.field();
    let now = encode_dt(Utc::now());
    let key = code.clone();

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(&format!("SELECT 1 FROM {table} WHERE code = ?1"), [&key], |_| Ok(()))
          .optional()?
          .is_some();
        if !exists {
          return Ok(Err(Refusal::LookupNotFound));
        }

        let referencing = ops::fetch_papers_where(&tx, &format!("p.{column} = ?1"), [&key])?;
        if !referencing.is_empty() && policy == DeletePolicy::Restrict {
          return Ok(Err(Refusal::LookupInUse(referencing.len())));
        }

        let cleared = referencing.len();
        let mut sequences = ops::Sequences::default();
        for raw in referencing {
          let mut fields = raw.fields.clone();
          // Setting an empty code clears the reference and cannot fail.
          let _ = fields.set(field, "");
          let unique_name = if scheme.constituents().contains(&field) {
            let previous = Some((raw.unique_name.as_str(), &raw.fields));
            ops::assign_name(&tx, &mut sequences, scheme, &fields, previous)?
          } else {
            raw.unique_name.clone()
          };
          ops::update_paper(&tx, raw.id, &fields, &unique_name, &now)?;
        }

        tx.execute(&format!("DELETE FROM {table} WHERE code = ?1"), [&key])?;
        tx.commit()?;
        Ok(Ok(cleared))
      })
      .await?;

    let cleared = result.map_err(|refusal| refusal.into_error(kind, &code, ""))?;
    tracing::info!(%kind, %code, cleared, "deleted lookup");
    Ok(cleared)
  }
}
