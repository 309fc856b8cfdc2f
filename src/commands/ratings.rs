use super::require_non_blank;
use crate::database::{Database, UserRating};
use crate::error::AppError;
use serde::Serialize;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct RatingsResponse {
    pub user_id: String,
    pub ratings: Vec<UserRating>,
}

/// Record or replace a user's rating of a show. Show names are stored
/// case-folded, so "Lost" and "lost" are the same show.
pub fn rate(db: &Database, user_id: &str, show_name: &str, rating: i64) -> Result<String, AppError> {
    let user_id = require_non_blank("user_id", user_id)?;
    let show_name = require_non_blank("show_name", show_name)?;
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::Validation(format!(
            "rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )));
    }

    log::info!("rate: {} rates {:?} {}/5", user_id, show_name, rating);
    db.upsert_rating(user_id, show_name, rating)?;
    Ok(format!("{} = {}/5 for {}", show_name, rating, user_id))
}

pub fn list_ratings(db: &Database, user_id: &str) -> Result<RatingsResponse, AppError> {
    let user_id = require_non_blank("user_id", user_id)?;
    let ratings = db.get_ratings(user_id)?;
    log::info!("list_ratings for {} returning {} ratings", user_id, ratings.len());
    Ok(RatingsResponse {
        user_id: user_id.to_string(),
        ratings,
    })
}
