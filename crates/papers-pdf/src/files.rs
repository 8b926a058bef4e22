//! Copying, deleting and renaming PDFs under the PDF root.

use std::{
  collections::{HashMap, HashSet},
  fs,
  path::{Path, PathBuf},
};

use crate::{Error, Result, resolve};

const PDF_EXT: &str = "pdf";

/// Copy `source` into `root` as `<unique_name>.pdf` and return the name to
/// store on the record, relative to `root`.
///
/// Without a unique name the source file name is kept.
pub fn attach(source: &Path, root: &Path, unique_name: &str) -> Result<String> {
  if !source.is_file() {
    return Err(Error::NotFound(source.to_path_buf()));
  }
  let file_name = match unique_name.trim() {
    "" => source
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .ok_or_else(|| Error::NotFound(source.to_path_buf()))?,
    name => format!("{name}.{PDF_EXT}"),
  };
  fs::create_dir_all(root).map_err(Error::io(root))?;
  let target = root.join(&file_name);
  if target.exists() {
    return Err(Error::TargetExists(target));
  }
  fs::copy(source, &target).map_err(Error::io(&target))?;
  tracing::info!(from = %source.display(), to = %target.display(), "attached PDF");
  Ok(file_name)
}

/// Delete the file a record points at and return its resolved path.
pub fn remove(stored: &str, root: Option<&Path>) -> Result<PathBuf> {
  let path = resolve(stored, root)?;
  fs::remove_file(&path).map_err(Error::io(&path))?;
  tracing::info!(path = %path.display(), "removed PDF");
  Ok(path)
}

/// PDFs anywhere under `root` whose file stem equals one of `names`.
///
/// A missing root yields an empty map.
pub fn find_named(root: &Path, names: &HashSet<&str>) -> Result<HashMap<String, PathBuf>> {
  let mut found = HashMap::new();
  if !root.is_dir() {
    return Ok(found);
  }
  let mut pending = vec![root.to_path_buf()];
  while let Some(dir) = pending.pop() {
    for entry in fs::read_dir(&dir).map_err(Error::io(&dir))? {
      let path = entry.map_err(Error::io(&dir))?.path();
      if path.is_dir() {
        pending.push(path);
        continue;
      }
      let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PDF_EXT));
      let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
      if is_pdf && names.contains(stem) {
        found.insert(stem.to_owned(), path);
      }
    }
  }
  Ok(found)
}

/// One planned file rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfRename {
  pub from: PathBuf,
  pub to:   PathBuf,
}

/// Plan renames for `(old_name, new_name)` pairs: each PDF named after an
/// old unique name moves to the new name in the same directory.
pub fn plan_renames(root: &Path, changes: &[(String, String)]) -> Result<Vec<PdfRename>> {
  let wanted: HashSet<&str> = changes
    .iter()
    .map(|(old, _)| old.as_str())
    .filter(|old| !old.is_empty())
    .collect();
  let found = find_named(root, &wanted)?;
  let plan = changes
    .iter()
    .filter(|(old, new)| !new.is_empty() && old != new)
    .filter_map(|(old, new)| {
      let from = found.get(old)?;
      let ext = from.extension().map(|e| e.to_string_lossy().into_owned());
      let to = from.with_file_name(format!("{new}.{}", ext.as_deref().unwrap_or(PDF_EXT)));
      Some(PdfRename { from: from.clone(), to })
    })
    .collect();
  Ok(plan)
}

/// Perform `renames` one by one. A rename whose target exists is refused;
/// failures are reported per entry and never stop the rest.
pub fn apply_renames(renames: &[PdfRename]) -> Vec<Result<PdfRename>> {
  renames
    .iter()
    .map(|rename| {
      if rename.to.exists() {
        return Err(Error::TargetExists(rename.to.clone()));
      }
      fs::rename(&rename.from, &rename.to).map_err(Error::io(&rename.from))?;
      tracing::debug!(from = %rename.from.display(), to = %rename.to.display(), "renamed PDF");
      Ok(rename.clone())
    })
    .collect()
}
