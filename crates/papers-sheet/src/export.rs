//! CSV and BibTeX export.

use std::{
  collections::{BTreeSet, HashMap},
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

use papers_core::paper::{Field, Paper};

use crate::Result;

/// Extension field consulted for the BibTeX entry type.
const TYPE_FIELD: &str = "type";

const KEY_TITLE_LEN: usize = 20;

// ─── CSV ─────────────────────────────────────────────────────────────────────

/// Column order: `id`, every well-known field, the unique name and both
/// timestamps, then extension fields sorted by name.
pub fn csv_header(papers: &[Paper]) -> Vec<String> {
  let mut header = vec!["id".to_owned()];
  header.extend(Field::ALL.iter().map(|f| f.as_str().to_owned()));
  header.extend(["unique_name", "created_at", "updated_at"].map(str::to_owned));
  header.extend(extra_names(papers));
  header
}

fn extra_names(papers: &[Paper]) -> BTreeSet<String> {
  papers.iter().flat_map(|p| p.extras.keys().cloned()).collect()
}

pub fn write_csv<W: Write>(writer: W, papers: &[Paper]) -> Result<()> {
  let extras = extra_names(papers);
  let mut out = csv::Writer::from_writer(writer);
  out.write_record(csv_header(papers))?;
  for paper in papers {
    let mut record = vec![paper.id.to_string()];
    record.extend(Field::ALL.iter().map(|f| paper.fields.get(*f)));
    record.push(paper.unique_name.clone());
    record.push(paper.created_at.to_rfc3339());
    record.push(paper.updated_at.to_rfc3339());
    record.extend(extras.iter().map(|name| paper.extras.get(name).cloned().unwrap_or_default()));
    out.write_record(&record)?;
  }
  out.flush()?;
  Ok(())
}

/// Write `papers` to a new CSV file at `path`.
pub fn export_csv(path: impl AsRef<Path>, papers: &[Paper]) -> Result<()> {
  let file = File::create(path.as_ref())?;
  write_csv(BufWriter::new(file), papers)?;
  tracing::info!(path = %path.as_ref().display(), papers = papers.len(), "exported CSV");
  Ok(())
}

// ─── BibTeX ──────────────────────────────────────────────────────────────────

/// Citation key: first author word, year and up to twenty title characters.
fn base_key(paper: &Paper) -> String {
  let author: String = paper
    .fields
    .authors
    .split(|c: char| !c.is_alphanumeric())
    .find(|w| !w.is_empty())
    .unwrap_or_default()
    .to_owned();
  let year = paper.fields.year.map(|y| y.to_string()).unwrap_or_default();
  let title: String =
    paper.fields.title.chars().filter(|c| c.is_alphanumeric()).take(KEY_TITLE_LEN).collect();
  let key = format!("{author}{year}{title}");
  if key.is_empty() { format!("paper{}", paper.id) } else { key }
}

fn entry_type(paper: &Paper) -> &'static str {
  let kind = paper.extras.get(TYPE_FIELD).map(|t| t.to_lowercase()).unwrap_or_default();
  if kind.contains("book") {
    "book"
  } else if kind.contains("conference") || kind.contains("proceeding") {
    "inproceedings"
  } else {
    "article"
  }
}

/// Braces would unbalance the entry; line breaks are folded.
fn bib_value(raw: &str) -> String {
  raw
    .chars()
    .filter(|c| !matches!(c, '{' | '}'))
    .map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c })
    .collect::<String>()
    .trim()
    .to_owned()
}

fn bibtex_entry(paper: &Paper, key: &str) -> String {
  let f = &paper.fields;
  let authors = f.authors.split(';').map(str::trim).filter(|a| !a.is_empty()).collect::<Vec<_>>();
  let year = f.year.map(|y| y.to_string()).unwrap_or_default();
  let note = paper.extras.get(TYPE_FIELD).map(|t| format!("Type: {t}")).unwrap_or_default();
  let fields = [
    ("title", f.title.clone()),
    ("author", authors.join(" and ")),
    ("year", year),
    ("journal", f.journal.clone()),
    ("doi", f.doi.clone()),
    ("url", f.url.clone()),
    ("abstract", f.r#abstract.clone()),
    ("keywords", f.keywords.clone()),
    ("note", note),
  ];
  let lines: Vec<String> = fields
    .iter()
    .map(|(name, value)| (name, bib_value(value)))
    .filter(|(_, value)| !value.is_empty())
    .map(|(name, value)| format!("  {name} = {{{value}}}"))
    .collect();
  format!("@{}{{{key},\n{}\n}}", entry_type(paper), lines.join(",\n"))
}

/// Entries separated by blank lines. Repeated keys get `a`, `b`, ...
pub fn write_bibtex<W: Write>(mut writer: W, papers: &[Paper]) -> Result<()> {
  let mut used: HashMap<String, u32> = HashMap::new();
  let mut entries = Vec::with_capacity(papers.len());
  for paper in papers {
    let base = base_key(paper);
    let seen = used.entry(base.clone()).or_insert(0);
    let key = match *seen {
      0 => base,
      n => format!("{base}{}", suffix(n)),
    };
    *seen += 1;
    entries.push(bibtex_entry(paper, &key));
  }
  writer.write_all(entries.join("\n\n").as_bytes())?;
  writer.write_all(b"\n")?;
  writer.flush()?;
  Ok(())
}

/// `1 -> a`, `26 -> z`, `27 -> aa`.
fn suffix(mut n: u32) -> String {
  let mut out = Vec::new();
  while n > 0 {
    n -= 1;
    out.push(char::from(b'a' + (n % 26) as u8));
    n /= 26;
  }
  out.iter().rev().collect()
}

pub fn export_bibtex(path: impl AsRef<Path>, papers: &[Paper]) -> Result<()> {
  let file = File::create(path.as_ref())?;
  write_bibtex(BufWriter::new(file), papers)?;
  tracing::info!(path = %path.as_ref().display(), papers = papers.len(), "exported BibTeX");
  Ok(())
}
