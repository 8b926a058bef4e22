//! Persistent user settings.
//!
//! Stored as TOML in the platform config directory. `PAPERS_*`
//! environment variables override the file for the running process only:
//! every change is written back immediately, but only the file's own values
//! and the ones set through the store reach disk.

use std::{
  collections::HashMap,
  env, fs,
  path::{Path, PathBuf},
};

use directories::ProjectDirs;
use papers_core::{lookup::DeletePolicy, naming::NamingScheme, store::DEFAULT_LIMIT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entries kept in [`Settings::recent_databases`].
pub const MAX_RECENT: usize = 10;

const FILE_NAME: &str = "settings.toml";

const ENV_PREFIX: &str = "PAPERS";

/// Every key accepted by [`SettingsStore::get`] and [`SettingsStore::set`].
pub const KEYS: [&str; 10] = [
  "db_path",
  "pdf_root",
  "search_limit",
  "naming_scheme",
  "delete_policy",
  "window_geometry",
  "recent_databases",
  "last_import_dir",
  "last_export_dir",
  "log_dir",
];

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("unknown setting: {0}")]
  UnknownKey(String),

  #[error("invalid value {value:?} for {key}: {reason}")]
  InvalidValue { key: String, value: String, reason: String },

  #[error("failed to load settings: {0}")]
  Load(#[from] config::ConfigError),

  #[error("failed to serialise settings: {0}")]
  Serialize(#[from] toml::ser::Error),

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path:   PathBuf,
    #[source]
    source: config::ConfigError,
  },

  #[error("failed to write {}: {source}", path.display())]
  Write {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub db_path:          Option<PathBuf>,
  pub pdf_root:         Option<PathBuf>,
  pub search_limit:     usize,
  pub naming_scheme:    NamingScheme,
  pub delete_policy:    DeletePolicy,
  /// Opaque window-state blob kept for graphical front ends.
  pub window_geometry:  String,
  /// Most recent first.
  pub recent_databases: Vec<PathBuf>,
  pub last_import_dir:  Option<PathBuf>,
  pub last_export_dir:  Option<PathBuf>,
  pub log_dir:          Option<PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      db_path:          None,
      pdf_root:         None,
      search_limit:     DEFAULT_LIMIT,
      naming_scheme:    NamingScheme::default(),
      delete_policy:    DeletePolicy::default(),
      window_geometry:  String::new(),
      recent_databases: Vec::new(),
      last_import_dir:  None,
      last_export_dir:  None,
      log_dir:          None,
    }
  }
}

impl Settings {
  /// Move `path` to the front of the recent list.
  pub fn push_recent(&mut self, path: &Path) {
    self.recent_databases.retain(|p| p != path);
    self.recent_databases.insert(0, path.to_path_buf());
    self.recent_databases.truncate(MAX_RECENT);
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Settings bound to the file they flush to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
  path:     PathBuf,
  /// File values plus changes made through the store; what gets flushed.
  stored:   Settings,
  /// `stored` with environment overrides applied.
  settings: Settings,
  /// Variables to read instead of the process environment.
  env:      Option<HashMap<String, String>>,
}

impl SettingsStore {
  /// `<config dir>/papers/settings.toml`, when the platform has a home.
  pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "papers").map(|dirs| dirs.config_dir().join(FILE_NAME))
  }

  /// Load from `path`; a missing file yields defaults.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self> { Self::load_with_env(path, None) }

  fn load_with_env(path: impl Into<PathBuf>, env: Option<HashMap<String, String>>) -> Result<Self> {
    let path = path.into();
    let stored = read_file(&path, false)?;
    let mut store = Self { path, settings: stored.clone(), stored, env };
    store.settings = store.overlay_env(&store.stored)?;
    Ok(store)
  }

  fn overlay_env(&self, stored: &Settings) -> Result<Settings> {
    let body = toml::to_string(stored)?;
    let settings = config::Config::builder()
      .add_source(config::File::from_str(&body, config::FileFormat::Toml))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).source(self.env.clone()))
      .build()?
      .try_deserialize()?;
    Ok(settings)
  }

  pub fn path(&self) -> &Path { &self.path }

  pub fn settings(&self) -> &Settings { &self.settings }

  /// Textual value of `key`. Unset paths read as the empty string.
  pub fn get(&self, key: &str) -> Result<String> {
    let s = &self.settings;
    let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
    Ok(match key {
      "db_path" => path(&s.db_path),
      "pdf_root" => path(&s.pdf_root),
      "search_limit" => s.search_limit.to_string(),
      "naming_scheme" => s.naming_scheme.to_string(),
      "delete_policy" => s.delete_policy.to_string(),
      "window_geometry" => s.window_geometry.clone(),
      "recent_databases" => env::join_paths(&s.recent_databases)
        .map(|joined| joined.to_string_lossy().into_owned())
        .unwrap_or_default(),
      "last_import_dir" => path(&s.last_import_dir),
      "last_export_dir" => path(&s.last_export_dir),
      "log_dir" => path(&s.log_dir),
      other => return Err(SettingsError::UnknownKey(other.to_owned())),
    })
  }

  /// Parse and store `value` under `key`, then flush.
  pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    let invalid = |reason: String| SettingsError::InvalidValue {
      key:   key.to_owned(),
      value: value.to_owned(),
      reason,
    };
    let path = || (!value.is_empty()).then(|| PathBuf::from(value));
    let mut next = self.stored.clone();
    match key {
      "db_path" => next.db_path = path(),
      "pdf_root" => next.pdf_root = path(),
      "search_limit" => {
        next.search_limit = match value.parse::<usize>() {
          Ok(0) => return Err(invalid("must be at least 1".into())),
          Ok(n) => n,
          Err(e) => return Err(invalid(e.to_string())),
        }
      }
      "naming_scheme" => next.naming_scheme = value.parse().map_err(|e| invalid(format!("{e}")))?,
      "delete_policy" => next.delete_policy = value.parse().map_err(|e| invalid(format!("{e}")))?,
      "window_geometry" => next.window_geometry = value.to_owned(),
      "recent_databases" => {
        let listed: Vec<PathBuf> =
          env::split_paths(value).filter(|p| !p.as_os_str().is_empty()).collect();
        next.recent_databases = Vec::new();
        for p in listed.iter().rev() {
          next.push_recent(p);
        }
      }
      "last_import_dir" => next.last_import_dir = path(),
      "last_export_dir" => next.last_export_dir = path(),
      "log_dir" => next.log_dir = path(),
      other => return Err(SettingsError::UnknownKey(other.to_owned())),
    }
    self.replace(next)
  }

  /// Apply `change` and flush.
  pub fn update(&mut self, change: impl FnOnce(&mut Settings)) -> Result<()> {
    let mut next = self.stored.clone();
    change(&mut next);
    self.replace(next)
  }

  pub fn add_recent_database(&mut self, path: &Path) -> Result<()> {
    self.update(|s| s.push_recent(path))
  }

  /// Restore defaults and flush.
  pub fn reset(&mut self) -> Result<()> { self.replace(Settings::default()) }

  /// Write the persisted settings to `file`. Environment overrides are
  /// left out.
  pub fn export(&self, file: &Path) -> Result<()> {
    write_toml(file, &self.stored)?;
    tracing::info!(path = %file.display(), "exported settings");
    Ok(())
  }

  /// Replace the persisted settings with those in `file` and flush. Keys the
  /// file omits take their defaults.
  pub fn import(&mut self, file: &Path) -> Result<()> {
    let next = read_file(file, true)?;
    self.replace(next)?;
    tracing::info!(path = %file.display(), "imported settings");
    Ok(())
  }

  fn replace(&mut self, next: Settings) -> Result<()> {
    if next != self.stored {
      write_toml(&self.path, &next)?;
      tracing::debug!(path = %self.path.display(), "saved settings");
      self.settings = self.overlay_env(&next)?;
      self.stored = next;
    }
    Ok(())
  }
}

fn read_file(path: &Path, required: bool) -> Result<Settings> {
  let read_err = |source| SettingsError::Read { path: path.to_path_buf(), source };
  config::Config::builder()
    .add_source(config::File::from(path).format(config::FileFormat::Toml).required(required))
    .build()
    .and_then(config::Config::try_deserialize::<Settings>)
    .map_err(read_err)
}

fn write_toml(path: &Path, settings: &Settings) -> Result<()> {
  let body = toml::to_string_pretty(settings)?;
  let write_err = |source| SettingsError::Write { path: path.to_path_buf(), source };
  if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
    fs::create_dir_all(dir).map_err(write_err)?;
  }
  fs::write(path, body).map_err(write_err)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_store() -> (tempfile::TempDir, SettingsStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::load(dir.path().join("nested/settings.toml")).unwrap();
    (dir, store)
  }

  #[test]
  fn missing_file_gives_defaults() {
    let (_dir, store) = temp_store();
    assert_eq!(store.settings(), &Settings::default());
    assert_eq!(store.get("search_limit").unwrap(), "1000");
    assert_eq!(store.get("naming_scheme").unwrap(), "hierarchical");
    assert_eq!(store.get("pdf_root").unwrap(), "");
  }

  #[test]
  fn set_flushes_immediately() {
    let (_dir, mut store) = temp_store();
    store.set("pdf_root", "/data/pdfs").unwrap();
    store.set("naming_scheme", "year-based").unwrap();
    store.set("search_limit", "50").unwrap();

    let reloaded = SettingsStore::load(store.path()).unwrap();
    assert_eq!(reloaded.settings().pdf_root, Some(PathBuf::from("/data/pdfs")));
    assert_eq!(reloaded.settings().naming_scheme, NamingScheme::YearBased);
    assert_eq!(reloaded.settings().search_limit, 50);
  }

  #[test]
  fn bad_keys_and_values_are_rejected() {
    let (_dir, mut store) = temp_store();
    assert!(matches!(store.set("colour", "red"), Err(SettingsError::UnknownKey(_))));
    assert!(matches!(store.get("colour"), Err(SettingsError::UnknownKey(_))));
    assert!(matches!(store.set("search_limit", "lots"), Err(SettingsError::InvalidValue { .. })));
    assert!(matches!(store.set("search_limit", "0"), Err(SettingsError::InvalidValue { .. })));
    assert!(matches!(store.set("naming_scheme", "random"), Err(SettingsError::InvalidValue { .. })));
    assert_eq!(store.settings(), &Settings::default());
    assert!(!store.path().exists());
  }

  #[test]
  fn recent_list_is_deduplicated_and_capped() {
    let (_dir, mut store) = temp_store();
    for i in 0..12 {
      store.add_recent_database(Path::new(&format!("/db/{i}.db"))).unwrap();
    }
    store.add_recent_database(Path::new("/db/5.db")).unwrap();
    let recent = &store.settings().recent_databases;
    assert_eq!(recent.len(), MAX_RECENT);
    assert_eq!(recent[0], PathBuf::from("/db/5.db"));
    assert_eq!(recent[1], PathBuf::from("/db/11.db"));
    assert_eq!(recent.iter().filter(|p| p.ends_with("5.db")).count(), 1);
  }

  #[test]
  fn reset_restores_defaults_on_disk() {
    let (_dir, mut store) = temp_store();
    store.set("delete_policy", "clear_references").unwrap();
    store.set("log_dir", "/var/log/papers").unwrap();
    store.reset().unwrap();
    let reloaded = SettingsStore::load(store.path()).unwrap();
    assert_eq!(reloaded.settings(), &Settings::default());
  }

  #[test]
  fn environment_overrides_are_never_written_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    let env = HashMap::from([("PAPERS_SEARCH_LIMIT".to_owned(), "7".to_owned())]);
    let mut store = SettingsStore::load_with_env(&path, Some(env)).unwrap();
    assert_eq!(store.settings().search_limit, 7);
    assert_eq!(store.get("search_limit").unwrap(), "7");

    store.set("pdf_root", "/data/pdfs").unwrap();
    assert_eq!(store.settings().search_limit, 7);
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("search_limit = 1000"), "{written}");
    assert!(!written.contains("search_limit = 7"));

    let reloaded = SettingsStore::load_with_env(&path, Some(HashMap::new())).unwrap();
    assert_eq!(reloaded.settings().search_limit, DEFAULT_LIMIT);
    assert_eq!(reloaded.settings().pdf_root, Some(PathBuf::from("/data/pdfs")));
  }

  #[test]
  fn set_values_win_in_the_file_while_the_environment_wins_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    let env = HashMap::from([("PAPERS_SEARCH_LIMIT".to_owned(), "7".to_owned())]);
    let mut store = SettingsStore::load_with_env(&path, Some(env)).unwrap();
    store.set("search_limit", "25").unwrap();
    assert_eq!(store.settings().search_limit, 7);
    let reloaded = SettingsStore::load_with_env(&path, Some(HashMap::new())).unwrap();
    assert_eq!(reloaded.settings().search_limit, 25);
  }

  #[test]
  fn export_then_import_replaces_persisted_settings() {
    let (dir, mut store) = temp_store();
    store.set("naming_scheme", "simple").unwrap();
    store.set("log_dir", "/var/log/papers").unwrap();
    let file = dir.path().join("exported.toml");
    store.export(&file).unwrap();

    let mut other = SettingsStore::load(dir.path().join("other.toml")).unwrap();
    other.set("search_limit", "3").unwrap();
    other.import(&file).unwrap();
    assert_eq!(other.settings().naming_scheme, NamingScheme::Simple);
    assert_eq!(other.settings().log_dir, Some(PathBuf::from("/var/log/papers")));
    assert_eq!(other.settings().search_limit, DEFAULT_LIMIT);
    assert_eq!(SettingsStore::load(other.path()).unwrap().settings(), other.settings());

    assert!(matches!(
      other.import(&dir.path().join("missing.toml")),
      Err(SettingsError::Read { .. })
    ));
  }

  #[test]
  fn empty_value_clears_a_path() {
    let (_dir, mut store) = temp_store();
    store.set("db_path", "/tmp/papers.db").unwrap();
    store.set("db_path", "").unwrap();
    assert_eq!(store.settings().db_path, None);
  }
}
