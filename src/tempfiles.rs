use std::path::Path;
use tracing::{debug, warn};

/// Delete engine temp files (`<prefix>*<suffix>`) from `dir`.
///
/// Best-effort: an unreadable directory or a file that refuses to delete
/// is logged and skipped, never an error that could stall shutdown.
/// Returns the number of files removed.
pub fn sweep_temp_files(dir: &Path, prefix: &str, suffix: &str) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("failed to scan {} for temp files: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !matches_pattern(name, prefix, suffix) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("deleted temp file {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("failed to delete temp file {}: {}", path.display(), e),
        }
    }
    removed
}

fn matches_pattern(name: &str, prefix: &str, suffix: &str) -> bool {
    name.len() >= prefix.len() + suffix.len()
        && name.starts_with(prefix)
        && name.ends_with(suffix)
}
