use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::TimetableEntry;

/// Fixed store filename inside the data directory; the whole batch lives
/// under this one key.
pub const STORE_FILE: &str = "timetable.json";

pub fn store_path(dir: &Path) -> PathBuf {
    dir.join(STORE_FILE)
}

/// Load the stored batch. A missing file is an empty timetable, not an
/// error; a corrupt file is an error so the caller can keep its previous
/// in-memory state.
pub fn load(dir: &Path) -> Result<Vec<TimetableEntry>> {
    let path = store_path(dir);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries: Vec<TimetableEntry> =
        serde_json::from_str(&content).context("Failed to parse stored timetable")?;

    debug!(count = entries.len(), "Loaded stored timetable");
    Ok(entries)
}

/// Replace the stored batch wholesale. Written to a temp file and renamed
/// into place, so a reader never observes a partial batch.
pub fn save(dir: &Path, entries: &[TimetableEntry]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let path = store_path(dir);
    let tmp = dir.join(format!("{}.tmp", STORE_FILE));

    let json = serde_json::to_string_pretty(entries)?;
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    debug!(count = entries.len(), path = %path.display(), "Saved timetable");
    Ok(())
}
