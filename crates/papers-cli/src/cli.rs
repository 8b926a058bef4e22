//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use papers_core::{
  naming::NamingScheme,
  paper::{Field, PaperId},
  store::SearchQuery,
};

#[derive(Parser, Debug)]
#[command(name = "papers", version, about = "Personal database of scientific papers")]
pub struct Cli {
  /// Database file (default: the `db_path` setting, then ./papers.db).
  #[arg(long, global = true, value_name = "FILE")]
  pub db: Option<PathBuf>,

  /// Settings file (default: the platform config directory).
  #[arg(long, global = true, value_name = "FILE")]
  pub settings: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Build or extend a database from a spreadsheet.
  Import(ImportArgs),

  /// Search papers; without a query every paper is listed.
  #[command(visible_alias = "list")]
  Search(SearchArgs),

  /// Show every field of one paper.
  Show {
    id:   PaperId,
    #[arg(long)]
    json: bool,
  },

  /// Add a paper from FIELD=VALUE assignments.
  Add {
    /// Field assignment, e.g. `--set title="Deep Nets"`; repeatable.
    #[arg(short, long = "set", value_name = "FIELD=VALUE", required = true)]
    set: Vec<String>,
    /// Copy this PDF into the PDF root under the new unique name.
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,
  },

  /// Change fields of a paper. An empty value clears the field.
  Edit {
    id:  PaperId,
    #[arg(short, long = "set", value_name = "FIELD=VALUE", required = true)]
    set: Vec<String>,
  },

  /// Delete papers; nothing is deleted if any id is unknown.
  Delete {
    #[arg(required = true)]
    ids:      Vec<PaperId>,
    /// Also delete each paper's PDF file.
    #[arg(long)]
    with_pdf: bool,
  },

  /// Open a paper's PDF in the system viewer, or its DOI page.
  Open {
    id:  PaperId,
    /// Open https://doi.org/<doi> in the browser instead of the PDF.
    #[arg(long)]
    doi: bool,
  },

  /// Copy a PDF into the PDF root and link it to a paper.
  Attach { id: PaperId, file: PathBuf },

  /// Write papers to CSV (default), BibTeX, or a bundle directory.
  Export(ExportArgs),

  /// Check unique names, lookup references and the search index.
  Validate,

  /// Distinct non-empty values of one field, e.g. `journal`.
  Values { field: Field },

  /// Record counts by year and recent additions.
  Stats {
    #[arg(long)]
    json: bool,
  },

  /// Rebuild the full-text index from the papers table.
  RebuildIndex,

  /// Recompute every unique name under a naming scheme.
  Rename(RenameArgs),

  /// Describe the naming schemes, or preview them for one paper.
  Schemes { id: Option<PaperId> },

  /// Manage categories.
  #[command(subcommand)]
  Category(LookupAction),

  /// Manage projects.
  #[command(subcommand)]
  Project(LookupAction),

  /// Read and change settings.
  #[command(subcommand)]
  Config(ConfigAction),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
  /// Spreadsheet to read (.xlsx, .xlsm, .xls, .ods or .csv).
  pub file:      PathBuf,
  /// Database to create or extend.
  #[arg(short, long, value_name = "DB")]
  pub out:       Option<PathBuf>,
  /// Sheet to import (default: the one with the most rows).
  #[arg(long, value_name = "NAME")]
  pub sheet:     Option<String>,
  /// Replace an existing database.
  #[arg(long, conflicts_with = "append")]
  pub overwrite: bool,
  /// Add to an existing database.
  #[arg(long)]
  pub append:    bool,
}

/// Equality filters shared by search and export.
#[derive(Args, Debug, Clone, Default)]
pub struct Filters {
  #[arg(long)]
  pub year:     Option<i32>,
  #[arg(long)]
  pub journal:  Option<String>,
  #[arg(long)]
  pub category: Option<String>,
  #[arg(long)]
  pub project:  Option<String>,
  #[arg(long)]
  pub status:   Option<String>,
}

impl Filters {
  pub fn query(&self, text: Option<String>, limit: usize) -> SearchQuery {
    SearchQuery {
      text,
      year: self.year,
      journal: self.journal.clone(),
      category: self.category.clone(),
      project: self.project.clone(),
      status: self.status.clone(),
      limit,
    }
  }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
  /// Free-text query matched against title, authors, journal, abstract,
  /// keywords, tags and notes.
  pub query:   Vec<String>,
  #[command(flatten)]
  pub filters: Filters,
  /// Maximum results (default: the `search_limit` setting).
  #[arg(long)]
  pub limit:   Option<usize>,
  #[arg(long)]
  pub json:    bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
  /// Output file, or the directory with --bundle.
  pub out:     PathBuf,
  /// Write BibTeX instead of CSV.
  #[arg(long, conflicts_with = "bundle")]
  pub bibtex:  bool,
  /// Write papers.bib, papers_metadata.csv, README.txt and a PDFs/ folder
  /// of copies into the OUT directory.
  #[arg(long)]
  pub bundle:  bool,
  /// Only export papers matching this text.
  #[arg(long, value_name = "TEXT")]
  pub query:   Option<String>,
  #[command(flatten)]
  pub filters: Filters,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
  #[arg(long)]
  pub scheme:      NamingScheme,
  /// Write the new names; without this only a preview is printed.
  #[arg(long)]
  pub execute:     bool,
  /// Also rename PDFs under the PDF root that carry an old name.
  #[arg(long)]
  pub rename_pdfs: bool,
  /// Copy the database to `<db>.backup` first.
  #[arg(long)]
  pub backup:      bool,
}

#[derive(Subcommand, Debug)]
pub enum LookupAction {
  /// Create an entry; the code is derived from the name unless given.
  Add {
    name:        String,
    #[arg(long)]
    code:        Option<String>,
    #[arg(long, default_value = "")]
    description: String,
  },
  List,
  /// Add the starter entries, skipping codes and names already present.
  Seed,
  /// Rename an entry or change its description.
  Edit {
    code:        String,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Delete an entry under the configured delete policy.
  Remove { code: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
  Get { key: String },
  Set { key: String, value: String },
  List,
  /// Restore every setting to its default.
  Reset,
  /// Print the settings file location.
  Path,
  /// Write the persisted settings to a TOML file.
  Export { file: PathBuf },
  /// Replace the persisted settings with those read from a TOML file.
  Import { file: PathBuf },
}
