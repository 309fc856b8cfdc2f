use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.yaml";
const APP_DIR: &str = "subtitle-finder";

pub const ENV_DB_PATH: &str = "SUBFIND_DB";
pub const ENV_SUBTITLES_ROOT: &str = "SUBFIND_SUBTITLES_ROOT";

/// Knobs for the search ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Upper bound on episodes retrieved before reranking
    pub candidate_pool_size: usize,
    pub result_limit: usize,
    /// Shows promoted ahead of the primary ordering
    pub top_series: usize,
    pub phrase_boost: f64,
    pub coverage_bonus: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            candidate_pool_size: 100,
            result_limit: 5,
            top_series: 3,
            phrase_boost: 2.0,
            coverage_bonus: 0.1,
        }
    }
}

/// Knobs for the recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub result_limit: usize,
    pub top_tokens_per_show: usize,
    pub min_liked_rating: i64,
    /// Inclusive idf window; keeps out both filler words and proper nouns
    pub idf_min: f64,
    pub idf_max: f64,
    pub min_token_len: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            result_limit: 6,
            top_tokens_per_show: 4,
            min_liked_rating: 3,
            idf_min: 1.0,
            idf_max: 2.8,
            min_token_len: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// A file is kept when its upper-cased name contains one of these tags.
    /// Empty keeps everything.
    pub language_tags: Vec<String>,
    pub extension: String,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            language_tags: vec!["VF".to_string(), "FR".to_string()],
            extension: "srt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub subtitles_root: PathBuf,
    pub ranking: RankingConfig,
    pub recommend: RecommendConfig,
    pub bulk: BulkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            database_path: data_dir.join("subtitles.db"),
            subtitles_root: PathBuf::from("data").join("subtitles"),
            ranking: RankingConfig::default(),
            recommend: RecommendConfig::default(),
            bulk: BulkConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the configuration.
    ///
    /// An explicit path must exist and parse. Without one, the platform
    /// config dir is tried and defaults are used when nothing is there.
    /// Afterwards `.env` in `env_dir` and then the process environment may
    /// override the database path and subtitles root.
    pub fn load(explicit: Option<&Path>, env_dir: &Path) -> Result<Self, AppError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(
            |key| std::env::var(key).ok().filter(|v| !v.is_empty()),
            env_dir,
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, env_lookup: F, env_dir: &Path)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env_lookup(key).or_else(|| load_env_value(env_dir, key));

        if let Some(db) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(root) = lookup(ENV_SUBTITLES_ROOT) {
            self.subtitles_root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let r = &self.recommend;
        if r.idf_min > r.idf_max {
            return Err(AppError::Config(format!(
                "idf window is empty: idf_min {} > idf_max {}",
                r.idf_min, r.idf_max
            )));
        }
        if !(1..=5).contains(&r.min_liked_rating) {
            return Err(AppError::Config(format!(
                "min_liked_rating must be between 1 and 5, got {}",
                r.min_liked_rating
            )));
        }
        if self.ranking.result_limit == 0 {
            return Err(AppError::Config("ranking.result_limit must be positive".into()));
        }
        Ok(())
    }
}

/// `<platform config dir>/subtitle-finder/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILENAME))
}

/// Load a value from the .env file by key name
pub fn load_env_value(dir: &Path, key: &str) -> Option<String> {
    let env_path = dir.join(".env");
    let prefix = format!("{}=", key);
    let content = std::fs::read_to_string(&env_path).ok()?;
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(&prefix) {
            let value = rest.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
