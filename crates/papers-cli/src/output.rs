//! Plain-text and JSON rendering of command results.

use std::io::{self, Write};

use papers_core::{
  lookup::Lookup,
  naming::NamingScheme,
  paper::{Field, Paper, PaperId},
  store::{NameChange, Stats, ValidationReport},
};
use serde::Serialize;

const TITLE_WIDTH: usize = 48;
const AUTHORS_WIDTH: usize = 24;

/// Cut `text` to `width` characters, marking the cut with `…`.
fn clip(text: &str, width: usize) -> String {
  if text.chars().count() <= width {
    return text.to_owned();
  }
  let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
  clipped.push('…');
  clipped
}

pub fn json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> io::Result<()> {
  serde_json::to_writer_pretty(&mut *out, value)?;
  writeln!(out)
}

// ─── Papers ──────────────────────────────────────────────────────────────────

/// One line per paper: id, year, unique name, title and authors.
pub fn paper_table(out: &mut impl Write, papers: &[Paper]) -> io::Result<()> {
  if papers.is_empty() {
    return writeln!(out, "no papers found");
  }
  let name_width = papers
    .iter()
    .map(|p| p.unique_name.chars().count())
    .max()
    .unwrap_or(0)
    .max("NAME".len());
  writeln!(
    out,
    "{:>6}  {:<4}  {:<name_width$}  {:<TITLE_WIDTH$}  AUTHORS",
    "ID", "YEAR", "NAME", "TITLE"
  )?;
  for paper in papers {
    writeln!(
      out,
      "{:>6}  {:<4}  {:<name_width$}  {:<TITLE_WIDTH$}  {}",
      paper.id,
      paper.fields.get(Field::Year),
      paper.unique_name,
      clip(&paper.fields.title, TITLE_WIDTH),
      clip(&paper.fields.authors, AUTHORS_WIDTH),
    )?;
  }
  writeln!(out, "{} papers", papers.len())
}

/// Every non-empty field of one paper, then its extension fields.
pub fn paper_detail(out: &mut impl Write, paper: &Paper) -> io::Result<()> {
  let label_width = Field::ALL
    .iter()
    .map(|f| f.as_str().len())
    .chain(paper.extras.keys().map(String::len))
    .chain(["unique_name".len()])
    .max()
    .unwrap_or(0);
  writeln!(out, "{:<label_width$}  {}", "id", paper.id)?;
  writeln!(out, "{:<label_width$}  {}", "unique_name", paper.unique_name)?;
  for field in Field::ALL {
    let value = paper.fields.get(field);
    if !value.is_empty() {
      writeln!(out, "{:<label_width$}  {value}", field.as_str())?;
    }
  }
  for (name, value) in &paper.extras {
    writeln!(out, "{name:<label_width$}  {value}")?;
  }
  writeln!(out, "{:<label_width$}  {}", "created_at", paper.created_at.to_rfc3339())?;
  writeln!(out, "{:<label_width$}  {}", "updated_at", paper.updated_at.to_rfc3339())
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

pub fn stats(out: &mut impl Write, stats: &Stats) -> io::Result<()> {
  writeln!(out, "total records:    {}", stats.total_records)?;
  writeln!(out, "added this week:  {}", stats.recent_additions)?;
  writeln!(out, "search:           {}", stats.backend)?;
  if !stats.by_year.is_empty() {
    writeln!(out, "by year:")?;
    for (year, count) in &stats.by_year {
      writeln!(out, "  {year}  {count}")?;
    }
  }
  Ok(())
}

fn id_list(ids: &[PaperId]) -> String {
  ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

pub fn validation(out: &mut impl Write, report: &ValidationReport) -> io::Result<()> {
  if report.is_clean() {
    return writeln!(out, "no problems found");
  }
  for issue in report.issues() {
    writeln!(out, "- {issue}")?;
  }
  if !report.empty_unique_names.is_empty() {
    writeln!(out, "  empty names: {}", id_list(&report.empty_unique_names))?;
  }
  for (name, papers) in &report.duplicate_unique_names {
    writeln!(out, "  {name}: {}", id_list(papers))?;
  }
  if !report.nonconforming_names.is_empty() {
    writeln!(out, "  nonconforming: {}", id_list(&report.nonconforming_names))?;
  }
  for (id, kind, code) in &report.dangling_references {
    writeln!(out, "  paper {id}: unknown {kind} {code}")?;
  }
  Ok(())
}

/// Old and new names for every record whose name would change.
pub fn name_changes(out: &mut impl Write, changes: &[NameChange]) -> io::Result<()> {
  let changed: Vec<&NameChange> = changes.iter().filter(|c| c.is_change()).collect();
  for change in &changed {
    let old = if change.old_name.is_empty() { "(none)" } else { &change.old_name };
    writeln!(out, "{:>6}  {old} -> {}", change.id, change.new_name)?;
  }
  let unnamed = changes.iter().filter(|c| c.new_name.is_empty()).count();
  write!(out, "{} of {} names change", changed.len(), changes.len())?;
  if unnamed > 0 {
    write!(out, "; {unnamed} records lack the fields to be named")?;
  }
  writeln!(out)
}

pub fn schemes(out: &mut impl Write, current: NamingScheme) -> io::Result<()> {
  for scheme in NamingScheme::ALL {
    let marker = if scheme == current { "*" } else { " " };
    writeln!(out, "{marker} {:<14} {}", scheme.as_str(), scheme.description())?;
  }
  Ok(())
}

pub fn scheme_preview(out: &mut impl Write, names: &[(NamingScheme, String)]) -> io::Result<()> {
  for (scheme, name) in names {
    let name = if name.is_empty() { "(missing fields)" } else { name };
    writeln!(out, "{:<14} {name}", scheme.as_str())?;
  }
  Ok(())
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub fn lookups(out: &mut impl Write, lookups: &[Lookup]) -> io::Result<()> {
  for lookup in lookups {
    if lookup.description.is_empty() {
      writeln!(out, "{}  {}", lookup.code, lookup.name)?;
    } else {
      writeln!(out, "{}  {}  ({})", lookup.code, lookup.name, lookup.description)?;
    }
  }
  Ok(())
}
