use crate::database::{BigramCount, Database, Episode, UnigramCount};
use crate::error::AppError;
use serde::Serialize;

pub const DEFAULT_TOP: i64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct UnigramsResponse {
    pub episode_id: i64,
    pub episode: Episode,
    pub unigrams: Vec<UnigramCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BigramsResponse {
    pub episode_id: i64,
    pub episode: Episode,
    pub bigrams: Vec<BigramCount>,
}

fn check_top(top: i64) -> Result<i64, AppError> {
    if top <= 0 {
        return Err(AppError::Validation(format!("top must be positive, got {}", top)));
    }
    Ok(top)
}

fn require_episode(db: &Database, episode_id: i64) -> Result<Episode, AppError> {
    db.get_episode_by_id(episode_id)?
        .ok_or_else(|| AppError::NotFound(format!("episode {}", episode_id)))
}

/// Most frequent tokens of an episode, with the episode's metadata.
pub fn top_unigrams(db: &Database, episode_id: i64, top: i64) -> Result<UnigramsResponse, AppError> {
    let top = check_top(top)?;
    let episode = require_episode(db, episode_id)?;
    let unigrams = db.top_unigrams(episode_id, top)?;
    if unigrams.is_empty() {
        return Err(AppError::NotFound(format!("no unigrams for episode {}", episode_id)));
    }
    Ok(UnigramsResponse {
        episode_id,
        episode,
        unigrams,
    })
}

pub fn top_bigrams(db: &Database, episode_id: i64, top: i64) -> Result<BigramsResponse, AppError> {
    let top = check_top(top)?;
    let episode = require_episode(db, episode_id)?;
    let bigrams = db.top_bigrams(episode_id, top)?;
    if bigrams.is_empty() {
        return Err(AppError::NotFound(format!("no bigrams for episode {}", episode_id)));
    }
    Ok(BigramsResponse {
        episode_id,
        episode,
        bigrams,
    })
}
