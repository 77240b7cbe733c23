// On-disk article store: one `articles_YYYY-MM-DD.json` file per collection day.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

const ARTICLES_PREFIX: &str = "articles_";

/// `<data_dir>/articles_<date>.json`
pub fn articles_path(data_dir: &Path, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("{ARTICLES_PREFIX}{}.json", date.format("%Y-%m-%d")))
}

/// `<data_dir>/sources_<language>_<date>.json`
pub fn sources_path(data_dir: &Path, language: &str, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("sources_{language}_{}.json", date.format("%Y-%m-%d")))
}

/// Write records as pretty-printed UTF-8 JSON, creating the directory if needed.
/// An existing file for the same path is replaced.
pub fn save_json<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), records = records.len(), "Saved file");
    Ok(())
}

/// The most recently modified articles file in `data_dir`, if any.
/// Ties on modification time go to the later file name.
pub fn latest_articles_file(data_dir: &Path) -> Result<Option<PathBuf>> {
    if !data_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to list {}", data_dir.display()))?;

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_articles = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(ARTICLES_PREFIX) && n.ends_with(".json"));
        if !is_articles {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let newer = match &latest {
            None => true,
            Some((time, best)) => modified > *time || (modified == *time && path > *best),
        };
        if newer {
            latest = Some((modified, path));
        }
    }

    Ok(latest.map(|(_, path)| path))
}
