use super::elapsed_ms;
use crate::config::BulkConfig;
use crate::database::{Database, DfSummary, IndexStats, IndexSummary};
use crate::error::AppError;
use crate::indexer::{self, BulkIndexReport};
use crate::text::TokenCounts;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub database: bool,
    pub path: String,
}

fn require_file(file_path: &Path) -> Result<(), AppError> {
    if !file_path.is_file() {
        return Err(AppError::NotFound(format!(
            "subtitle file {}",
            file_path.display()
        )));
    }
    Ok(())
}

/// Index (or reindex) one subtitle file as an episode.
pub fn index_subtitle_file(
    db: &Database,
    file_path: &Path,
    show_name: Option<&str>,
    season: Option<i64>,
    episode: Option<i64>,
) -> Result<IndexSummary, AppError> {
    let start = Instant::now();
    log::info!(
        "index called: file={} show={:?} season={:?} episode={:?}",
        file_path.display(),
        show_name,
        season,
        episode
    );
    require_file(file_path)?;
    let show_name = show_name.map(str::trim).filter(|s| !s.is_empty());

    let summary = indexer::index_file(db, file_path, show_name, season, episode)?;
    log::info!(
        "Indexed episode {}: {} tokens, {} unigrams, {} bigrams in {} ms",
        summary.episode_id,
        summary.total_tokens,
        summary.unique_unigrams,
        summary.unique_bigrams,
        elapsed_ms(start)
    );
    Ok(summary)
}

pub fn bulk_index(db: &Database, root: &Path, config: &BulkConfig) -> Result<BulkIndexReport, AppError> {
    log::info!("bulk_index called on {}", root.display());
    if !root.is_dir() {
        return Err(AppError::NotFound(format!("subtitle root {}", root.display())));
    }
    Ok(indexer::index_directory(db, root, config)?)
}

pub fn rebuild_df(db: &Database) -> Result<DfSummary, AppError> {
    log::info!("rebuild_df called");
    Ok(indexer::rebuild_document_frequencies(db)?)
}

pub fn index_stats(db: &Database) -> Result<IndexStats, AppError> {
    db.get_stats().map_err(AppError::from)
}

pub fn check_db(db: &Database) -> HealthStatus {
    let database = db.check_db();
    if !database {
        log::warn!("Database check failed for {}", db.path().display());
    }
    HealthStatus {
        database,
        path: db.path().to_string_lossy().to_string(),
    }
}

/// Token statistics of a file without indexing it.
pub fn preview_file(file_path: &Path, top_k: usize) -> Result<TokenCounts, AppError> {
    require_file(file_path)?;
    Ok(indexer::token_counts_from_file(file_path, top_k)?)
}
