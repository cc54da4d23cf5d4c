use crate::error::{Result, UpdateDbError};
use std::fs;
use std::path::{Path, PathBuf};

/// Walks from `start` up to the filesystem root and returns the first directory
/// whose entry names satisfy `predicate`.
///
/// `start` is canonicalised first so relative paths such as `.` still reach the
/// real root. Directories that cannot be listed are treated as empty.
pub fn find_ancestor<F>(start: impl AsRef<Path>, mut predicate: F) -> Result<Option<PathBuf>>
where
    F: FnMut(&Path, &[String]) -> bool,
{
    let start = start.as_ref();
    let canonical = start.canonicalize().map_err(|e| {
        UpdateDbError::Io(std::io::Error::new(
            e.kind(),
            format!("Invalid path '{}': {e}", start.display()),
        ))
    })?;

    for dir in canonical.ancestors() {
        let names = entry_names(dir);
        if predicate(dir, &names) {
            tracing::debug!("Matched ancestor {}", dir.display());
            return Ok(Some(dir.to_path_buf()));
        }
    }

    Ok(None)
}

fn entry_names(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}
