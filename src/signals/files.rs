//! New-file counting for steps whose output is a directory of images.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

use super::types::ZeroSignal;

/// Count files under `dir` with an accepted extension modified at or after `since`.
///
/// `exts` are lowercase and dot-prefixed (e.g. `.png`); comparison is
/// case-insensitive on the file side.
pub fn count_new_files(dir: &Path, exts: &[String], since: SystemTime) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() || !has_accepted_ext(entry.path(), exts) {
            continue;
        }
        let modified = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?
            .modified()
            .with_context(|| format!("No mtime for {}", entry.path().display()))?;
        if modified >= since {
            count += 1;
        }
    }
    Ok(count)
}

/// Verdict for an output directory: zero new files is a confident zero,
/// and a walk error is `Unknown`.
pub fn new_files_signal(dir: &Path, exts: &[String], since: SystemTime) -> ZeroSignal {
    match count_new_files(dir, exts, since) {
        Ok(count) => {
            tracing::debug!(dir = %dir.display(), count, "new output files");
            ZeroSignal::from_count(count as u64)
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %format!("{:#}", e), "could not count output files");
            ZeroSignal::Unknown
        }
    }
}

fn has_accepted_ext(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .is_some_and(|ext| exts.contains(&ext))
}
