//! File entry expansion for the batch API.
//!
//! `to_json_schemas_from_files` accepts either an explicit path list or
//! a glob pattern (`*`, `?`, `**`). Globs are expanded against the base
//! directory with a filesystem walk; `node_modules` trees are never
//! walked, matching is against the path relative to the base directory,
//! and results come back sorted for deterministic output.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

/// Input of the batch file API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntries {
    /// Explicit entry files, each walked for imports independently.
    Paths(Vec<PathBuf>),
    /// A glob pattern expanded relative to the base directory.
    Glob(String),
}

impl FileEntries {
    pub fn paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        FileEntries::Paths(paths.into_iter().map(Into::into).collect())
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        FileEntries::Glob(pattern.into())
    }
}

/// Expand entries to a concrete file list.
pub fn expand_entries(entries: &FileEntries, base_dir: &Path) -> Result<Vec<PathBuf>> {
    match entries {
        FileEntries::Paths(paths) => Ok(paths.clone()),
        FileEntries::Glob(pattern) => expand_glob(pattern, base_dir),
    }
}

fn expand_glob(pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let glob = Glob::new(pattern).map_err(|err| Error::Glob {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    let set = builder.build().map_err(|err| Error::Glob {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;

    let mut matched = BTreeSet::new();
    let walker = WalkDir::new(base_dir).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIPPED_DIRS.contains(&name))
    });
    for entry in walker.into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        if glob_matches(&set, entry.path(), base_dir) {
            matched.insert(entry.path().to_path_buf());
        }
    }
    Ok(matched.into_iter().collect())
}

fn glob_matches(set: &GlobSet, path: &Path, base_dir: &Path) -> bool {
    if let Ok(relative) = path.strip_prefix(base_dir) {
        if set.is_match(relative) {
            return true;
        }
    }
    set.is_match(path)
}
