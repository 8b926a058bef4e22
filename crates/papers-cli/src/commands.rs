//! Command execution.
//!
//! Import and settings commands manage their own resources; everything
//! else runs against an open store through [`Context`].

use std::{
  fs,
  io::Write,
  path::{Path, PathBuf},
};

use anyhow::{Context as _, bail};
use papers_core::{
  lookup::{LookupKind, NewLookup},
  naming,
  paper::{Field, NewPaper, Paper, PaperId, PaperPatch},
  store::{NameChange, PaperStore},
};
use papers_pdf::{Opener, PdfRename};
use papers_store_sqlite::{SqliteStore, StoreOptions};

use crate::{
  cli::{Command, ConfigAction, ExportArgs, ImportArgs, LookupAction, RenameArgs, SearchArgs},
  output,
  settings::{KEYS, Settings, SettingsStore},
};

/// Used when neither `--db` nor the `db_path` setting names a database.
pub const DEFAULT_DB: &str = "papers.db";

/// Files SQLite keeps next to a WAL-mode database.
const SIDECARS: [&str; 2] = ["-wal", "-shm"];

pub fn resolve_db_path(explicit: Option<PathBuf>, settings: &Settings) -> PathBuf {
  explicit
    .or_else(|| settings.db_path.clone())
    .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
  let mut name = path.as_os_str().to_owned();
  name.push(suffix);
  PathBuf::from(name)
}

/// The directory of `file`, if it has a non-empty one.
fn parent_dir(file: &Path) -> Option<PathBuf> {
  file.parent().filter(|d| !d.as_os_str().is_empty()).map(Path::to_path_buf)
}

/// Open the database at `path` with the configured naming scheme and
/// delete policy, and remember it as the most recent database. A new
/// database starts with the default categories and projects.
pub async fn open_store(path: &Path, settings: &mut SettingsStore) -> anyhow::Result<SqliteStore> {
  let current = settings.settings();
  let options = StoreOptions {
    naming: current.naming_scheme,
    delete_policy: current.delete_policy,
    ..Default::default()
  };
  let created = !path.exists();
  if created {
    tracing::info!(path = %path.display(), "creating new database");
  }
  let store = SqliteStore::open(path, options)
    .await
    .with_context(|| format!("failed to open database {}", path.display()))?;
  if created {
    for kind in [LookupKind::Category, LookupKind::Project] {
      store.seed_lookups(kind).await?;
    }
  }
  let recent = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
  settings.add_recent_database(&recent)?;
  Ok(store)
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Build a database from a spreadsheet. An existing database is only
/// touched with `--overwrite` (replaced) or `--append` (extended).
pub async fn import(
  args: ImportArgs,
  db: Option<PathBuf>,
  settings: &mut SettingsStore,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  let db_path = resolve_db_path(args.out.or(db), settings.settings());
  let exists = db_path.exists();
  if exists && !args.overwrite && !args.append {
    bail!(
      "database {} already exists; pass --overwrite to replace it or --append to extend it",
      db_path.display()
    );
  }

  let batch = papers_sheet::load(&args.file, args.sheet.as_deref())
    .with_context(|| format!("failed to read {}", args.file.display()))?;
  tracing::info!(
    sheet = %batch.sheet,
    rows = batch.papers.len(),
    columns = batch.columns.len(),
    "prepared import"
  );

  if exists && args.overwrite {
    for path in std::iter::once(db_path.clone()).chain(SIDECARS.map(|s| sidecar(&db_path, s))) {
      if path.exists() {
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
      }
    }
    tracing::info!(path = %db_path.display(), "replaced existing database");
  }

  let store = open_store(&db_path, settings).await?;
  let imported = batch.papers.len();
  let ids = store.import(batch.papers).await.context("import failed; nothing was written")?;
  let total = store.count().await?;

  writeln!(
    out,
    "imported {imported} papers from sheet {:?} into {} ({total} total)",
    batch.sheet,
    db_path.display()
  )?;
  if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
    writeln!(out, "new ids {first}..={last}")?;
  }
  if batch.skipped_rows > 0 {
    writeln!(out, "skipped {} empty rows", batch.skipped_rows)?;
  }
  if batch.invalid_years > 0 {
    writeln!(out, "warning: {} rows had an unreadable year and were imported without one", batch.invalid_years)?;
  }
  if let Some(dir) = parent_dir(&args.file) {
    settings.update(|s| s.last_import_dir = Some(dir))?;
  }
  Ok(())
}

// ─── Settings ────────────────────────────────────────────────────────────────

pub fn config(
  action: ConfigAction,
  settings: &mut SettingsStore,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  match action {
    ConfigAction::Get { key } => writeln!(out, "{}", settings.get(&key)?)?,
    ConfigAction::Set { key, value } => {
      settings.set(&key, &value)?;
      writeln!(out, "{key} = {}", settings.get(&key)?)?;
    }
    ConfigAction::List => {
      for key in KEYS {
        writeln!(out, "{key} = {}", settings.get(key)?)?;
      }
    }
    ConfigAction::Reset => {
      settings.reset()?;
      writeln!(out, "settings restored to defaults")?;
    }
    ConfigAction::Path => writeln!(out, "{}", settings.path().display())?,
    ConfigAction::Export { file } => {
      settings.export(&file)?;
      writeln!(out, "exported settings to {}", file.display())?;
    }
    ConfigAction::Import { file } => {
      settings.import(&file)?;
      writeln!(out, "imported settings from {}", file.display())?;
    }
  }
  Ok(())
}

// ─── Store commands ──────────────────────────────────────────────────────────

/// Everything a store-backed command needs.
pub struct Context<'a, S, O, W> {
  pub store:    &'a S,
  pub settings: &'a mut SettingsStore,
  pub db_path:  &'a Path,
  pub opener:   &'a O,
  pub out:      &'a mut W,
}

impl<S, O, W> Context<'_, S, O, W>
where
  S: PaperStore,
  O: Opener,
  W: Write,
{
  pub async fn run(&mut self, command: Command) -> anyhow::Result<()> {
    match command {
      Command::Search(args) => self.search(args).await,
      Command::Show { id, json } => {
        let paper = self.paper(id).await?;
        if json {
          output::json(self.out, &paper)?;
        } else {
          output::paper_detail(self.out, &paper)?;
        }
        Ok(())
      }
      Command::Add { set, pdf } => self.add(&set, pdf.as_deref()).await,
      Command::Edit { id, set } => {
        let patch = PaperPatch::from_assignments(set.iter().map(String::as_str))?;
        let paper = self.store.update(id, patch).await?;
        writeln!(self.out, "updated paper {id}: {}", paper.unique_name)?;
        Ok(())
      }
      Command::Delete { ids, with_pdf } => self.delete(&ids, with_pdf).await,
      Command::Open { id, doi: true } => {
        let paper = self.paper(id).await?;
        let url = papers_pdf::open_doi(self.opener, &paper.fields.doi)
          .with_context(|| format!("cannot open the DOI of paper {id}"))?;
        writeln!(self.out, "opened {url}")?;
        Ok(())
      }
      Command::Open { id, doi: false } => {
        let paper = self.paper(id).await?;
        let path = papers_pdf::open_pdf(self.opener, &paper.fields.pdf, self.pdf_root())
          .with_context(|| format!("cannot open the PDF of paper {id}"))?;
        writeln!(self.out, "opened {}", path.display())?;
        Ok(())
      }
      Command::Attach { id, file } => {
        let paper = self.paper(id).await?;
        let paper = self.attach(&paper, &file).await?;
        writeln!(self.out, "attached {} to paper {id}", paper.fields.pdf)?;
        Ok(())
      }
      Command::Export(args) => self.export(args).await,
      Command::Validate => {
        let report = self.store.validate().await?;
        output::validation(self.out, &report)?;
        let issues = report.issues().len();
        if issues > 0 {
          bail!("validation found {issues} problems");
        }
        Ok(())
      }
      Command::Values { field } => {
        for value in self.store.distinct_values(field).await? {
          writeln!(self.out, "{value}")?;
        }
        Ok(())
      }
      Command::Stats { json } => {
        let stats = self.store.stats().await?;
        if json {
          output::json(self.out, &stats)?;
        } else {
          output::stats(self.out, &stats)?;
        }
        Ok(())
      }
      Command::RebuildIndex => {
        self.store.rebuild_search_index().await?;
        writeln!(self.out, "search index rebuilt ({})", self.store.search_backend())?;
        Ok(())
      }
      Command::Rename(args) => self.rename(args).await,
      Command::Schemes { id: None } => {
        output::schemes(self.out, self.store.naming_scheme())?;
        Ok(())
      }
      Command::Schemes { id: Some(id) } => {
        let paper = self.paper(id).await?;
        writeln!(self.out, "names for paper {id}, counters shown as 1:")?;
        output::scheme_preview(self.out, &naming::preview(&paper.fields, Some(1)))?;
        Ok(())
      }
      Command::Category(action) => self.lookup(LookupKind::Category, action).await,
      Command::Project(action) => self.lookup(LookupKind::Project, action).await,
      Command::Import(_) | Command::Config(_) => {
        bail!("this command does not run against an open database")
      }
    }
  }

  fn pdf_root(&self) -> Option<&Path> { self.settings.settings().pdf_root.as_deref() }

  async fn paper(&self, id: PaperId) -> anyhow::Result<Paper> {
    self
      .store
      .get(id)
      .await?
      .with_context(|| format!("paper {id} not found"))
  }

  async fn search(&mut self, args: SearchArgs) -> anyhow::Result<()> {
    let text = (!args.query.is_empty()).then(|| args.query.join(" "));
    let limit = args.limit.unwrap_or(self.settings.settings().search_limit);
    let query = args.filters.query(text, limit);
    let papers = self.store.search(&query).await?;
    tracing::debug!(results = papers.len(), backend = %self.store.search_backend(), "search");
    if args.json {
      output::json(self.out, &papers)?;
    } else {
      output::paper_table(self.out, &papers)?;
    }
    Ok(())
  }

  async fn add(&mut self, assignments: &[String], pdf: Option<&Path>) -> anyhow::Result<()> {
    let input = NewPaper::from_assignments(assignments.iter().map(String::as_str))?;
    let mut paper = self.store.create(input).await?;
    if let Some(file) = pdf {
      paper = self.attach(&paper, file).await?;
    }
    writeln!(self.out, "added paper {}: {}", paper.id, paper.unique_name)?;
    Ok(())
  }

  /// Link `file` to `paper`. With a PDF root the file is copied there under
  /// the paper's unique name; without one the absolute source path is kept.
  async fn attach(&self, paper: &Paper, file: &Path) -> anyhow::Result<Paper> {
    let stored = match self.pdf_root() {
      Some(root) => papers_pdf::attach(file, root, &paper.unique_name)?,
      None => {
        let path = fs::canonicalize(file)
          .with_context(|| format!("file not found: {}", file.display()))?;
        path.to_string_lossy().into_owned()
      }
    };
    let patch = PaperPatch::new().set(Field::Pdf, stored)?;
    Ok(self.store.update(paper.id, patch).await?)
  }

  async fn delete(&mut self, ids: &[PaperId], with_pdf: bool) -> anyhow::Result<()> {
    let mut pdfs = Vec::new();
    if with_pdf {
      for &id in ids {
        if let Some(paper) = self.store.get(id).await? {
          if !paper.fields.pdf.is_empty() {
            pdfs.push((id, paper.fields.pdf));
          }
        }
      }
    }
    let deleted = self.store.delete(ids).await?;
    writeln!(self.out, "deleted {deleted} papers")?;

    let root = self.pdf_root().map(Path::to_path_buf);
    for (id, stored) in pdfs {
      match papers_pdf::remove(&stored, root.as_deref()) {
        Ok(path) => writeln!(self.out, "removed {}", path.display())?,
        Err(e) => {
          tracing::warn!(%id, error = %e, "could not remove PDF");
          writeln!(self.out, "warning: paper {id}: {e}")?;
        }
      }
    }
    Ok(())
  }

  async fn export(&mut self, args: ExportArgs) -> anyhow::Result<()> {
    let query = args.filters.query(args.query, usize::MAX);
    let papers = self.store.search(&query).await?;
    if args.bundle {
      return self.export_bundle(&args.out, &papers);
    }
    if args.bibtex {
      papers_sheet::export_bibtex(&args.out, &papers)?;
    } else {
      papers_sheet::export_csv(&args.out, &papers)?;
    }
    writeln!(self.out, "exported {} papers to {}", papers.len(), args.out.display())?;
    if let Some(dir) = parent_dir(&args.out) {
      self.settings.update(|s| s.last_export_dir = Some(dir))?;
    }
    Ok(())
  }

  fn export_bundle(&mut self, dir: &Path, papers: &[Paper]) -> anyhow::Result<()> {
    let root = self.pdf_root().map(Path::to_path_buf);
    let report = papers_sheet::export_bundle(dir, papers, |stored| {
      papers_pdf::resolve(stored, root.as_deref()).ok()
    })
    .with_context(|| format!("cannot write bundle to {}", dir.display()))?;
    writeln!(
      self.out,
      "exported {} papers and {} PDFs to {}",
      report.papers,
      report.copied.len(),
      dir.display()
    )?;
    for (id, pdf) in &report.missing {
      writeln!(self.out, "warning: PDF of paper {id} not found: {pdf}")?;
    }
    self.settings.update(|s| s.last_export_dir = Some(dir.to_path_buf()))?;
    Ok(())
  }

  /// Preview or apply new unique names, optionally renaming matching PDFs.
  async fn rename(&mut self, args: RenameArgs) -> anyhow::Result<()> {
    let root = self.pdf_root().map(Path::to_path_buf);
    if args.rename_pdfs && root.is_none() {
      bail!("--rename-pdfs needs the pdf_root setting");
    }
    if !args.execute {
      let changes = self.store.regenerate_names(args.scheme, false).await?;
      output::name_changes(self.out, &changes)?;
      writeln!(self.out, "dry run; pass --execute to write the new names")?;
      return Ok(());
    }

    if args.backup {
      let backup = backup_database(self.db_path)?;
      writeln!(self.out, "backed up database to {}", backup.display())?;
    }
    let changes = self.store.regenerate_names(args.scheme, true).await?;
    output::name_changes(self.out, &changes)?;
    self.settings.update(|s| s.naming_scheme = args.scheme)?;
    tracing::info!(scheme = %args.scheme, "applied naming scheme");

    if let (true, Some(root)) = (args.rename_pdfs, root) {
      let pairs: Vec<(String, String)> = changes
        .iter()
        .filter(|c| c.is_change())
        .map(|c| (c.old_name.clone(), c.new_name.clone()))
        .collect();
      let plan = papers_pdf::plan_renames(&root, &pairs)?;
      let mut renamed = 0;
      for result in papers_pdf::apply_renames(&plan) {
        match result {
          Ok(rename) => {
            renamed += 1;
            self.relink_pdf(&changes, &rename).await?;
          }
          Err(e) => writeln!(self.out, "warning: {e}")?,
        }
      }
      writeln!(self.out, "renamed {renamed} of {} PDFs", plan.len())?;
    }
    Ok(())
  }

  /// Point the record that owned a renamed PDF at its new file name.
  async fn relink_pdf(
    &self,
    changes: &[NameChange],
    rename: &PdfRename,
  ) -> anyhow::Result<()> {
    let (Some(old_stem), Some(new_file)) = (rename.from.file_stem(), rename.to.file_name()) else {
      return Ok(());
    };
    let Some(change) = changes.iter().find(|c| old_stem == c.old_name.as_str()) else {
      return Ok(());
    };
    let paper = self.paper(change.id).await?;
    let stored = Path::new(&paper.fields.pdf);
    if stored.file_stem() != Some(old_stem) {
      return Ok(());
    }
    let relinked = stored.with_file_name(new_file).to_string_lossy().into_owned();
    self.store.update(change.id, PaperPatch::new().set(Field::Pdf, relinked)?).await?;
    Ok(())
  }

  async fn lookup(&mut self, kind: LookupKind, action: LookupAction) -> anyhow::Result<()> {
    match action {
      LookupAction::Add { name, code, description } => {
        let lookup = self.store.add_lookup(kind, NewLookup { name, code, description }).await?;
        writeln!(self.out, "added {kind} {} ({})", lookup.code, lookup.name)?;
      }
      LookupAction::List => {
        let lookups = self.store.list_lookups(kind).await?;
        output::lookups(self.out, &lookups)?;
      }
      LookupAction::Seed => {
        let added = self.store.seed_lookups(kind).await?;
        writeln!(self.out, "added {added} default {kind} entries")?;
      }
      LookupAction::Edit { code, name, description } => {
        let code = code.trim().to_ascii_uppercase();
        let current = self
          .store
          .list_lookups(kind)
          .await?
          .into_iter()
          .find(|l| l.code == code)
          .with_context(|| format!("{kind} {code} not found"))?;
        let lookup = self
          .store
          .update_lookup(
            kind,
            code,
            name.unwrap_or(current.name),
            description.unwrap_or(current.description),
          )
          .await?;
        writeln!(self.out, "updated {kind} {} ({})", lookup.code, lookup.name)?;
      }
      LookupAction::Remove { code } => {
        let code = code.trim().to_ascii_uppercase();
        let cleared = self.store.delete_lookup(kind, code.clone()).await?;
        writeln!(self.out, "removed {kind} {code}")?;
        if cleared > 0 {
          writeln!(self.out, "cleared the reference on {cleared} papers")?;
        }
      }
    }
    Ok(())
  }
}

/// Copy the database (and its WAL, if any) to `<db>.backup`.
fn backup_database(db_path: &Path) -> anyhow::Result<PathBuf> {
  let backup = sidecar(db_path, ".backup");
  let copy = |from: &Path, to: &Path| {
    fs::copy(from, to)
      .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))
  };
  copy(db_path, &backup)?;
  let wal = sidecar(db_path, "-wal");
  if wal.exists() {
    copy(&wal, &sidecar(&backup, "-wal"))?;
  }
  tracing::info!(path = %backup.display(), "backed up database");
  Ok(backup)
}
