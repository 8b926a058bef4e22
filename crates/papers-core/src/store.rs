//! The `PaperStore` trait and supporting query and report types.
//!
//! The trait is implemented by storage backends (e.g. `papers-store-sqlite`).
//! The command-line front end depends on this abstraction, not on a
//! concrete backend.

use std::{collections::BTreeMap, fmt, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
  lookup::{Lookup, LookupKind, NewLookup},
  naming::NamingScheme,
  paper::{Field, NewPaper, Paper, PaperId, PaperPatch},
};

/// Result count used when a query does not set one.
pub const DEFAULT_LIMIT: usize = 1000;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`PaperStore::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
  /// Free-text query matched against [`Field::SEARCHABLE`].
  pub text:     Option<String>,
  pub year:     Option<i32>,
  /// Case-insensitive equality.
  pub journal:  Option<String>,
  pub category: Option<String>,
  pub project:  Option<String>,
  /// Read status, case-insensitive equality.
  pub status:   Option<String>,
  pub limit:    usize,
}

impl Default for SearchQuery {
  fn default() -> Self {
    Self {
      text:     None,
      year:     None,
      journal:  None,
      category: None,
      project:  None,
      status:   None,
      limit:    DEFAULT_LIMIT,
    }
  }
}

impl SearchQuery {
  pub fn text(text: impl Into<String>) -> Self {
    Self { text: Some(text.into()), ..Default::default() }
  }

  /// The free-text part, if it contains anything but whitespace.
  pub fn text_terms(&self) -> Option<&str> {
    self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
  }
}

/// How free-text search is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
  /// SQLite FTS5 shadow index, relevance ordered.
  FullText,
  /// Case-insensitive substring matching, ordered by id.
  Substring,
}

impl fmt::Display for SearchBackend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      SearchBackend::FullText => "full-text",
      SearchBackend::Substring => "substring",
    })
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Read-only diagnostic produced by [`PaperStore::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
  pub empty_unique_names:     Vec<PaperId>,
  /// Unique names shared by more than one paper.
  pub duplicate_unique_names: BTreeMap<String, Vec<PaperId>>,
  /// Non-empty names that do not have the configured scheme's shape.
  pub nonconforming_names:    Vec<PaperId>,
  /// Papers referencing a category or project code with no lookup entry.
  pub dangling_references:    Vec<(PaperId, LookupKind, String)>,
  /// `(papers, indexed)` row counts when the search index disagrees.
  pub index_mismatch:         Option<(u64, u64)>,
}

impl ValidationReport {
  pub fn is_clean(&self) -> bool { self.issues().is_empty() }

  /// One human-readable line per problem class.
  pub fn issues(&self) -> Vec<String> {
    let mut issues = Vec::new();
    if !self.empty_unique_names.is_empty() {
      issues.push(format!(
        "{} records have an empty unique name",
        self.empty_unique_names.len()
      ));
    }
    if !self.duplicate_unique_names.is_empty() {
      issues.push(format!(
        "{} duplicate unique name values found",
        self.duplicate_unique_names.len()
      ));
    }
    if !self.nonconforming_names.is_empty() {
      issues.push(format!(
        "{} unique names do not match the configured naming scheme",
        self.nonconforming_names.len()
      ));
    }
    if !self.dangling_references.is_empty() {
      issues.push(format!(
        "{} records reference an unknown category or project",
        self.dangling_references.len()
      ));
    }
    if let Some((papers, indexed)) = self.index_mismatch {
      issues.push(format!(
        "search index out of sync: {papers} records but {indexed} indexed"
      ));
    }
    issues
  }
}

/// Summary figures produced by [`PaperStore::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
  pub total_records:    u64,
  /// The ten most recent years and their record counts, newest first.
  pub by_year:          Vec<(i32, u64)>,
  /// Records created within the last seven days.
  pub recent_additions: u64,
  pub backend:          SearchBackend,
}

/// One planned or applied unique-name change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameChange {
  pub id:       PaperId,
  pub title:    String,
  pub old_name: String,
  /// Empty when the record lacks the scheme's required fields.
  pub new_name: String,
}

impl NameChange {
  pub fn is_change(&self) -> bool { !self.new_name.is_empty() && self.new_name != self.old_name }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a papers store backend.
///
/// Every method is one logical operation: it either completes in full or
/// leaves the store untouched.
pub trait PaperStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The scheme used to compute unique names on create and update.
  fn naming_scheme(&self) -> NamingScheme;

  /// The free-text search strategy currently in effect.
  fn search_backend(&self) -> SearchBackend;

  // ── Papers ────────────────────────────────────────────────────────────

  /// Insert a paper; the store assigns id, unique name and timestamps.
  fn create(
    &self,
    input: NewPaper,
  ) -> impl Future<Output = Result<Paper, Self::Error>> + Send + '_;

  /// Retrieve a paper by id. Returns `None` if not found.
  fn get(
    &self,
    id: PaperId,
  ) -> impl Future<Output = Result<Option<Paper>, Self::Error>> + Send + '_;

  /// Apply `patch`, recomputing the unique name when a constituent field
  /// changed. Errors if the paper does not exist.
  fn update(
    &self,
    id: PaperId,
    patch: PaperPatch,
  ) -> impl Future<Output = Result<Paper, Self::Error>> + Send + '_;

  /// Delete every paper in `ids`. All-or-nothing: if any id is unknown
  /// nothing is deleted and the error names it.
  fn delete<'a>(
    &'a self,
    ids: &'a [PaperId],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Search papers; at most `query.limit` results.
  fn search<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<Paper>, Self::Error>> + Send + 'a;

  /// Insert every paper in one transaction and return their ids in order.
  fn import(
    &self,
    papers: Vec<NewPaper>,
  ) -> impl Future<Output = Result<Vec<PaperId>, Self::Error>> + Send + '_;

  fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Distinct non-empty values of `field`, sorted.
  fn distinct_values(
    &self,
    field: Field,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Read-only integrity report.
  fn validate(&self) -> impl Future<Output = Result<ValidationReport, Self::Error>> + Send + '_;

  fn stats(&self) -> impl Future<Output = Result<Stats, Self::Error>> + Send + '_;

  /// Rebuild the search index from the primary table. No-op without one.
  fn rebuild_search_index(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Recompute every unique name under `scheme`, numbering counters in id
  /// order. With `apply` the new names are written in one transaction.
  fn regenerate_names(
    &self,
    scheme: NamingScheme,
    apply: bool,
  ) -> impl Future<Output = Result<Vec<NameChange>, Self::Error>> + Send + '_;

  // ── Lookups ───────────────────────────────────────────────────────────

  fn add_lookup(
    &self,
    kind: LookupKind,
    input: NewLookup,
  ) -> impl Future<Output = Result<Lookup, Self::Error>> + Send + '_;

  /// Insert the [starter entries](crate::lookup::defaults) of `kind`,
  /// skipping any whose code or name is already present. Returns how many
  /// were added.
  fn seed_lookups(
    &self,
    kind: LookupKind,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All lookups of `kind`, ordered by name.
  fn list_lookups(
    &self,
    kind: LookupKind,
  ) -> impl Future<Output = Result<Vec<Lookup>, Self::Error>> + Send + '_;

  /// Change the name and description of an existing lookup.
  fn update_lookup(
    &self,
    kind: LookupKind,
    code: String,
    name: String,
    description: String,
  ) -> impl Future<Output = Result<Lookup, Self::Error>> + Send + '_;

  /// Delete a lookup under the store's configured delete policy. Returns
  /// the number of papers whose reference was cleared.
  fn delete_lookup(
    &self,
    kind: LookupKind,
    code: String,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
