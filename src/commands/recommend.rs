use super::{elapsed_ms, require_non_blank};
use crate::config::RecommendConfig;
use crate::database::{Database, ShowScore, UserRating};
use crate::error::AppError;
use crate::ranking::recommend::{favorite_tokens, rank_recommendations, top_tokens_per_show};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendParams {
    pub limit: usize,
    pub top_tokens_per_fav: usize,
    pub liked_min_rating: i64,
    pub idf_window: [f64; 2],
}

impl From<&RecommendConfig> for RecommendParams {
    fn from(config: &RecommendConfig) -> Self {
        Self {
            limit: config.result_limit,
            top_tokens_per_fav: config.top_tokens_per_show,
            liked_min_rating: config.min_liked_rating,
            idf_window: [config.idf_min, config.idf_max],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub user_id: String,
    pub params: RecommendParams,
    pub liked_series: Vec<UserRating>,
    pub time_ms: f64,
    pub results: Vec<ShowScore>,
}

/// Shows the user has not rated highly, ranked by how strongly their
/// dialogue carries the distinctive vocabulary of the shows the user likes.
pub fn recommend(
    db: &Database,
    user_id: &str,
    config: &RecommendConfig,
) -> Result<RecommendResponse, AppError> {
    let start = Instant::now();
    let user_id = require_non_blank("user_id", user_id)?;
    log::info!("recommend called for user {}", user_id);

    let liked_series = db.liked_shows(user_id, config.min_liked_rating)?;
    let liked: HashSet<String> = liked_series.iter().map(|r| r.show_name.clone()).collect();

    let results = if liked.is_empty() {
        Vec::new()
    } else {
        let shows: Vec<String> = liked.iter().cloned().collect();
        let weights = db.show_token_weights(&shows, config.idf_min, config.idf_max)?;
        let favorites = favorite_tokens(&top_tokens_per_show(&weights, config));
        log::debug!("recommend: favourite tokens for {}: {:?}", user_id, favorites);

        if favorites.is_empty() {
            Vec::new()
        } else {
            let scores = db.show_scores_for_tokens(&favorites)?;
            rank_recommendations(scores, &liked, config.result_limit)
        }
    };

    let time_ms = elapsed_ms(start);
    log::info!(
        "recommend for {}: {} liked shows, {} results in {} ms",
        user_id,
        liked_series.len(),
        results.len(),
        time_ms
    );

    Ok(RecommendResponse {
        user_id: user_id.to_string(),
        params: RecommendParams::from(config),
        liked_series,
        time_ms,
        results,
    })
}
