//! Subtitle dialogue search and series recommendation.
//!
//! Subtitle files are reduced to per-episode unigram/bigram frequency tables
//! in SQLite; free-text queries are ranked against them with TF-IDF, phrase
//! boosting and per-show diversity, and users' show ratings drive a
//! content-based recommender over the same tables.

pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod indexer;
pub mod ranking;
pub mod text;

pub use config::AppConfig;
pub use database::Database;
pub use error::AppError;
