use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub show_name: Option<String>,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub file_path: String,
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnigramCount {
    pub token: String,
    pub freq: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigramCount {
    pub token1: String,
    pub token2: String,
    pub freq: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStat {
    pub token: String,
    pub df: i64,
    pub idf: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub show_name: String,
    pub rating: i64,
}

/// How a search candidate was retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    /// Contains every query token
    And,
    /// Contains at least one query token
    Or,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// One episode retrieved for a query, with its tf-idf score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub episode_id: i64,
    /// Empty when the episode was indexed without a show name
    pub show_name: String,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub file_path: String,
    pub matched_terms: i64,
    pub score: f64,
    pub match_type: MatchType,
}

/// Aggregated `sum(freq * idf)` of one token across one show's episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowTokenWeight {
    pub show_name: String,
    pub token: String,
    pub idf: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowScore {
    pub show_name: String,
    pub score: f64,
}

/// Counts persisted for one indexed episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub episode_id: i64,
    pub file: String,
    pub line_count: usize,
    pub total_tokens: usize,
    pub unique_unigrams: usize,
    pub unique_bigrams: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfSummary {
    pub documents: i64,
    pub tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub episodes: i64,
    pub shows: i64,
    pub unigram_rows: i64,
    pub bigram_rows: i64,
    pub df_tokens: i64,
}

/// Identity and metadata of an episode about to be (re)indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMeta {
    pub file_path: String,
    pub show_name: Option<String>,
    pub season: Option<i64>,
    pub episode: Option<i64>,
}
