//! Bulk indexing of a subtitle tree.
//!
//! Files are enumerated recursively, filtered on a language tag in the file
//! name, and indexed with season/episode numbers parsed from the stem and
//! the show name taken from the parent directory.

use super::index_file;
use crate::config::BulkConfig;
use crate::database::Database;
use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static EPISODE_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        // S01E02, S1E3, S01.E02, s01 - e02
        Regex::new(r"(?i)S(\d{1,2})[ ._-]*E(\d{1,2})").expect("SxxEyy pattern is valid"),
        // 2x01, 11X05
        Regex::new(r"(?i)(\d{1,2})x(\d{2})").expect("NxNN pattern is valid"),
    ]
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIndexReport {
    pub scanned: usize,
    pub indexed: usize,
    pub skipped_language: usize,
    pub skipped_pattern: usize,
    pub failed: usize,
}

/// Season and episode numbers from a file name; the first matching
/// pattern wins.
pub fn detect_season_episode(file_name: &str) -> Option<(i64, i64)> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());

    EPISODE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(&stem)?;
        let season = caps.get(1)?.as_str().parse().ok()?;
        let episode = caps.get(2)?.as_str().parse().ok()?;
        Some((season, episode))
    })
}

pub fn keep_by_language(file_name: &str, tags: &[String]) -> bool {
    if tags.is_empty() {
        return true;
    }
    let upper = file_name.to_uppercase();
    tags.iter().any(|tag| upper.contains(&tag.to_uppercase()))
}

/// Parent directory name with underscores turned into spaces.
pub fn show_from_path(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().replace('_', " ").trim().to_string())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn subtitle_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_extension(entry.path(), extension) {
                    files.push(entry.path().to_path_buf());
                }
            }
            Err(e) => log::warn!("Error accessing entry: {}", e),
        }
    }
    files
}

/// Index every matching subtitle file under `root`.
///
/// A file that fails to index is counted and logged; the run continues.
pub fn index_directory(db: &Database, root: &Path, config: &BulkConfig) -> Result<BulkIndexReport> {
    if !root.is_dir() {
        bail!("subtitle root is not a directory: {}", root.display());
    }

    let mut report = BulkIndexReport::default();
    for path in subtitle_files(root, &config.extension) {
        report.scanned += 1;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if !keep_by_language(&file_name, &config.language_tags) {
            log::debug!("Skipping {} (language)", path.display());
            report.skipped_language += 1;
            continue;
        }

        let Some((season, episode)) = detect_season_episode(&file_name) else {
            log::warn!("Skipping {}: no season/episode pattern", path.display());
            report.skipped_pattern += 1;
            continue;
        };

        let show = show_from_path(&path);
        let abs = path.canonicalize().unwrap_or_else(|_| path.clone());
        match index_file(db, &abs, Some(&show), Some(season), Some(episode)) {
            Ok(_) => report.indexed += 1,
            Err(e) => {
                log::warn!("Failed to index {}: {:#}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Bulk index of {}: {} scanned, {} indexed, {} skipped (language), {} skipped (pattern), {} failed",
        root.display(),
        report.scanned,
        report.indexed,
        report.skipped_language,
        report.skipped_pattern,
        report.failed
    );
    Ok(report)
}
