use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use regex::Regex;

use crate::models::error::IngestError;

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Expired files and empty directories that matched the pattern.
    pub candidates: Vec<PathBuf>,
    /// Candidates actually deleted. Empty on a dry run.
    pub removed: Vec<PathBuf>,
    /// Candidates that could not be deleted.
    pub failed: Vec<PathBuf>,
}

/// Delete files under `root` older than `max_age_days` whose path matches
/// `pattern`, then any matching directories left empty.
///
/// The walk is bottom-up so a directory emptied by the sweep is considered
/// after its contents. `pattern` must match at the start of the full path
/// (build it from the root, or start it with `.*`). `root` itself is never
/// removed. With `delete = false` candidates are only logged.
pub fn cleanup(max_age_days: f64, root: &Path, pattern: &Regex, delete: bool) -> Result<CleanupReport, IngestError> {
    log::info!(
        "Running cleanup: days {}, path {}, pattern {}, delete {}",
        max_age_days,
        root.display(),
        pattern,
        delete
    );
    let max_age = Duration::try_from_secs_f64(max_age_days * 86_400.0)
        .map_err(|e| IngestError::Configuration(format!("invalid retention age {}: {}", max_age_days, e)))?;
    let cutoff = SystemTime::now().checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut report = CleanupReport::default();
    if !root.is_dir() {
        return Ok(report);
    }
    sweep_dir(root, root, pattern, cutoff, delete, &mut report)?;
    Ok(report)
}

fn sweep_dir(
    dir: &Path,
    root: &Path,
    pattern: &Regex,
    cutoff: SystemTime,
    delete: bool,
    report: &mut CleanupReport,
) -> Result<(), IngestError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| IngestError::Storage(format!("failed to list {}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| IngestError::Storage(format!("failed to list {}: {}", dir.display(), e)))?;
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if file_type.is_dir() {
            sweep_dir(&path, root, pattern, cutoff, delete, report)?;
        } else if matches_path(pattern, &path) && is_expired(&path, cutoff) {
            remove(&path, false, delete, report);
        }
    }

    if dir != root && matches_path(pattern, dir) && is_empty_dir(dir) {
        remove(dir, true, delete, report);
    }
    Ok(())
}

/// `true` when `pattern` matches at the very start of the path.
fn matches_path(pattern: &Regex, path: &Path) -> bool {
    pattern
        .find(&path.to_string_lossy())
        .is_some_and(|m| m.start() == 0)
}

fn is_expired(path: &Path, cutoff: SystemTime) -> bool {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified <= cutoff,
        Err(e) => {
            log::warn!("Cannot read mtime of {}: {}", path.display(), e);
            false
        }
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}

fn remove(path: &Path, is_dir: bool, delete: bool, report: &mut CleanupReport) {
    report.candidates.push(path.to_path_buf());
    if !delete {
        log::info!("Would remove (dry run): {}", path.display());
        return;
    }

    let result = if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            log::info!("Removed {}", path.display());
            report.removed.push(path.to_path_buf());
        }
        Err(e) => {
            log::error!("Unable to remove {}: {}", path.display(), e);
            report.failed.push(path.to_path_buf());
        }
    }
}
