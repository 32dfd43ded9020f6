//! Merging the common tree into a function tree.
//!
//! The merge is one-directional: files from the common tree overwrite files
//! at the same relative path in the function tree, nothing is ever deleted,
//! and hidden entries (any name starting with `.`) are skipped together with
//! everything below them.

use std::fs;
use std::path::Path;

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Counts from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub files_copied: usize,
    pub directories_created: usize,
}

/// Fails with [`Error::InvalidTree`] unless `path` is an existing directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::InvalidTree {
            path: path.display().to_string(),
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Copies every non-hidden entry of `common` into `function`.
pub fn merge(common: &Path, function: &Path) -> Result<MergeSummary> {
    ensure_directory(common)?;
    ensure_directory(function)?;

    let mut summary = MergeSummary::default();
    let walker = WalkDir::new(common)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        // The root itself may be hidden (e.g. a clone under `.remotes`).
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let relative = entry.path().strip_prefix(common).map_err(|_| Error::InvalidTree {
            path: entry.path().display().to_string(),
        })?;
        let target = function.join(relative);

        if entry.file_type().is_dir() {
            if !target.is_dir() {
                fs::create_dir_all(&target)?;
                summary.directories_created += 1;
            }
        } else {
            fs::copy(entry.path(), &target)?;
            summary.files_copied += 1;
        }
    }

    debug!(
        "Merged {} into {}: {} file(s), {} new director(ies)",
        common.display(),
        function.display(),
        summary.files_copied,
        summary.directories_created
    );
    Ok(summary)
}
