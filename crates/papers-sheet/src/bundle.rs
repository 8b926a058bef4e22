//! Reference-manager export bundle: BibTeX, CSV metadata, PDF copies and a
//! README in one directory.

use std::{
  fs,
  path::{Path, PathBuf},
};

use chrono::Utc;
use papers_core::paper::{Paper, PaperId};

use crate::{Result, export_bibtex, export_csv};

pub const BIBTEX_FILE: &str = "papers.bib";
pub const CSV_FILE: &str = "papers_metadata.csv";
pub const PDF_DIR: &str = "PDFs";
pub const README_FILE: &str = "README.txt";

/// What [`export_bundle`] wrote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BundleReport {
  pub dir:     PathBuf,
  pub papers:  usize,
  /// Copies placed under `PDFs/`.
  pub copied:  Vec<PathBuf>,
  /// Papers whose stored PDF could not be found, with the stored value.
  pub missing: Vec<(PaperId, String)>,
}

/// Write the bundle for `papers` into `dir`, creating it if needed.
///
/// `locate` maps a stored PDF value to an existing file. Papers without a
/// PDF are skipped silently; papers whose PDF is missing are reported.
pub fn export_bundle(
  dir: impl AsRef<Path>,
  papers: &[Paper],
  locate: impl Fn(&str) -> Option<PathBuf>,
) -> Result<BundleReport> {
  let dir = dir.as_ref();
  let pdf_dir = dir.join(PDF_DIR);
  fs::create_dir_all(&pdf_dir)?;

  export_bibtex(dir.join(BIBTEX_FILE), papers)?;
  export_csv(dir.join(CSV_FILE), papers)?;

  let mut report = BundleReport { dir: dir.to_path_buf(), papers: papers.len(), ..Default::default() };
  for paper in papers.iter().filter(|p| !p.fields.pdf.trim().is_empty()) {
    let Some(source) = locate(&paper.fields.pdf) else {
      tracing::warn!(id = %paper.id, pdf = %paper.fields.pdf, "PDF not found; not bundled");
      report.missing.push((paper.id, paper.fields.pdf.clone()));
      continue;
    };
    let file_name = match paper.unique_name.as_str() {
      "" => source.file_name().map(|n| n.to_string_lossy().into_owned()),
      name => Some(format!("{name}.pdf")),
    };
    let Some(file_name) = file_name else {
      report.missing.push((paper.id, paper.fields.pdf.clone()));
      continue;
    };
    let target = pdf_dir.join(file_name);
    fs::copy(&source, &target)?;
    report.copied.push(target);
  }

  fs::write(dir.join(README_FILE), readme(papers.len()))?;
  tracing::info!(
    dir = %dir.display(),
    papers = report.papers,
    pdfs = report.copied.len(),
    missing = report.missing.len(),
    "exported bundle"
  );
  Ok(report)
}

fn readme(papers: usize) -> String {
  format!(
    "Papers Database Export\n\
     Generated on: {}\n\
     Number of papers: {papers}\n\
     \n\
     Files included:\n\
     - {BIBTEX_FILE}: BibTeX format for import into Zotero or other reference managers\n\
     - {CSV_FILE}: Complete metadata in CSV format\n\
     - {PDF_DIR}/: Folder containing PDF files of the papers\n\
     \n\
     To import into Zotero:\n\
     1. Open Zotero\n\
     2. Go to File > Import\n\
     3. Select the {BIBTEX_FILE} file\n\
     4. Manually attach PDFs from the {PDF_DIR} folder to each reference\n",
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
  )
}
