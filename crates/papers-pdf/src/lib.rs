//! Locating, opening and managing the PDF files papers point at.
//!
//! A record stores either an absolute path or one relative to the
//! configured PDF root. Opening hands the file, or a paper's DOI link, to
//! the platform's default handler through an [`Opener`].

pub mod error;
mod files;

pub use error::{Error, Result};
pub use files::{PdfRename, apply_renames, attach, find_named, plan_renames, remove};

use std::{
  path::{Path, PathBuf},
  process::{Command, ExitStatus},
};

/// Resolver prefix for bare DOIs.
pub const DOI_RESOLVER: &str = "https://doi.org/";

/// Resolve a stored PDF path to an existing file.
///
/// Relative paths are joined to `root` when one is configured.
pub fn resolve(stored: &str, root: Option<&Path>) -> Result<PathBuf> {
  let stored = stored.trim();
  if stored.is_empty() {
    return Err(Error::NoPdf);
  }
  let path = Path::new(stored);
  let path = match root {
    Some(root) if path.is_relative() => root.join(path),
    _ => path.to_path_buf(),
  };
  if !path.exists() {
    return Err(Error::NotFound(path));
  }
  Ok(path)
}

// ─── Opener ──────────────────────────────────────────────────────────────────

/// Launches an external viewer for a file or link.
pub trait Opener {
  /// Run the handler. Success means the handler accepted the target, not
  /// that it was displayed.
  fn open(&self, path: &Path) -> Result<()>;

  /// Desktop handlers take links the same way they take files.
  fn open_url(&self, url: &str) -> Result<()> { self.open(Path::new(url)) }
}

/// The desktop's default-application handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOpener {
  /// `open <path>`
  MacOs,
  /// `cmd /C start "" <path>`
  Windows,
  /// `xdg-open <path>`
  Xdg,
}

impl SystemOpener {
  /// The handler for the platform this binary was built for.
  pub fn detect() -> Self {
    if cfg!(target_os = "macos") {
      SystemOpener::MacOs
    } else if cfg!(target_os = "windows") {
      SystemOpener::Windows
    } else {
      SystemOpener::Xdg
    }
  }

  fn program(self) -> &'static str {
    match self {
      SystemOpener::MacOs => "open",
      SystemOpener::Windows => "cmd",
      SystemOpener::Xdg => "xdg-open",
    }
  }

  fn command(self, path: &Path) -> Command {
    let mut cmd = Command::new(self.program());
    if self == SystemOpener::Windows {
      cmd.args(["/C", "start", ""]);
    }
    cmd.arg(path);
    cmd
  }
}

impl Opener for SystemOpener {
  fn open(&self, path: &Path) -> Result<()> {
    let program = self.program();
    run(self.command(path), program)?;
    tracing::info!(target = %path.display(), program, "opened");
    Ok(())
  }
}

/// Run a handler to completion. The desktop handlers hand the target off
/// and exit, so waiting here reaps them without blocking on the viewer.
fn run(mut cmd: Command, program: &'static str) -> Result<ExitStatus> {
  let status = cmd.status().map_err(|source| Error::Launch { program, source })?;
  if !status.success() {
    return Err(Error::Handler { program, status });
  }
  Ok(status)
}

/// The link a DOI resolves through. Values that already are links are
/// kept as they are.
pub fn doi_url(doi: &str) -> Option<String> {
  let doi = doi.trim();
  if doi.is_empty() {
    return None;
  }
  let lower = doi.to_ascii_lowercase();
  if lower.starts_with("http://") || lower.starts_with("https://") {
    return Some(doi.to_owned());
  }
  let doi = if lower.starts_with("doi:") { doi[4..].trim_start() } else { doi };
  Some(format!("{DOI_RESOLVER}{doi}"))
}

/// Open the resolver page for `doi`, returning the link.
pub fn open_doi(opener: &impl Opener, doi: &str) -> Result<String> {
  let url = doi_url(doi).ok_or(Error::NoDoi)?;
  opener.open_url(&url)?;
  Ok(url)
}

/// Resolve `stored` and hand it to `opener`, returning the resolved path.
pub fn open_pdf(opener: &impl Opener, stored: &str, root: Option<&Path>) -> Result<PathBuf> {
  let path = resolve(stored, root)?;
  opener.open(&path)?;
  Ok(path)
}
