//! Frequency indexer: subtitle file -> unigram/bigram tables.

pub mod bulk;

use crate::database::{Database, DfSummary, EpisodeMeta, IndexSummary};
use crate::text::{bigrams, flatten_tokens, normalize_lines, read_subtitle_lines, token_counts, TokenCounts};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

pub use bulk::{detect_season_episode, index_directory, keep_by_language, show_from_path, BulkIndexReport};

/// Per-episode token statistics, built over the token stream flattened
/// across lines so pairs may span two subtitle lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeCounts {
    pub line_count: usize,
    pub total_tokens: usize,
    pub unigrams: BTreeMap<String, i64>,
    pub bigrams: BTreeMap<(String, String), i64>,
}

impl EpisodeCounts {
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let tokens = flatten_tokens(normalize_lines(lines));

        let mut unigrams: BTreeMap<String, i64> = BTreeMap::new();
        for token in &tokens {
            *unigrams.entry(token.clone()).or_insert(0) += 1;
        }

        let mut pairs: BTreeMap<(String, String), i64> = BTreeMap::new();
        for pair in bigrams(&tokens) {
            *pairs.entry(pair).or_insert(0) += 1;
        }

        Self {
            line_count: lines.len(),
            total_tokens: tokens.len(),
            unigrams,
            bigrams: pairs,
        }
    }
}

/// Index one subtitle file: extract, normalize, count and persist.
///
/// Idempotent for an unchanged file. Fails only when the file cannot be
/// read or the store is unavailable; nothing is retried here.
pub fn index_file(
    db: &Database,
    file_path: &Path,
    show_name: Option<&str>,
    season: Option<i64>,
    episode: Option<i64>,
) -> Result<IndexSummary> {
    let lines = read_subtitle_lines(file_path)
        .with_context(|| format!("reading subtitle file {}", file_path.display()))?;
    let counts = EpisodeCounts::from_lines(&lines);

    let file = file_path.to_string_lossy().to_string();
    let meta = EpisodeMeta {
        file_path: file.clone(),
        show_name: show_name.map(str::to_string),
        season,
        episode,
    };
    let episode_id = db.store_episode_counts(&meta, &counts.unigrams, &counts.bigrams)?;

    log::debug!(
        "Indexed {} as episode {} ({} tokens, {} unigrams, {} bigrams)",
        file,
        episode_id,
        counts.total_tokens,
        counts.unigrams.len(),
        counts.bigrams.len()
    );

    Ok(IndexSummary {
        episode_id,
        file,
        line_count: counts.line_count,
        total_tokens: counts.total_tokens,
        unique_unigrams: counts.unigrams.len(),
        unique_bigrams: counts.bigrams.len(),
    })
}

/// Recompute document frequencies for the whole corpus.
pub fn rebuild_document_frequencies(db: &Database) -> Result<DfSummary> {
    let summary = db.rebuild_token_df()?;
    log::info!(
        "Rebuilt token_df: {} tokens over {} episodes",
        summary.tokens,
        summary.documents
    );
    Ok(summary)
}

/// Token statistics of a single file, without touching the store.
pub fn token_counts_from_file(file_path: &Path, top_k: usize) -> Result<TokenCounts> {
    let lines = read_subtitle_lines(file_path)
        .with_context(|| format!("reading subtitle file {}", file_path.display()))?;
    Ok(token_counts(&lines, top_k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const THREE_LINES: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello world\n\n2\n00:00:03,000 --> 00:00:04,000\nThe world is big\n\n3\n00:00:05,000 --> 00:00:06,000\n<i>Hello again</i>\n";

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_counts_span_line_boundaries() {
        let counts = EpisodeCounts::from_lines(&["Hello world", "The world is big", "Hello again"]);
        assert_eq!(counts.line_count, 3);
        assert_eq!(counts.total_tokens, 5);
        assert_eq!(counts.unigrams.get("hello"), Some(&2));
        assert_eq!(counts.unigrams.get("world"), Some(&2));
        assert_eq!(counts.unigrams.get("big"), Some(&1));
        assert_eq!(counts.unigrams.len(), 3);
        assert_eq!(counts.bigrams.get(&pair("world", "world")), Some(&1));
        assert_eq!(counts.bigrams.get(&pair("big", "hello")), Some(&1));
    }

    #[test]
    fn test_empty_file_counts() {
        let counts = EpisodeCounts::from_lines::<&str>(&[]);
        assert_eq!(counts, EpisodeCounts::default());
    }

    #[test]
    fn test_index_file_persists_counts() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("t.db")).unwrap();
        let srt = temp.path().join("s01e01.srt");
        std::fs::write(&srt, THREE_LINES).unwrap();

        let summary = index_file(&db, &srt, Some("Demo"), Some(1), Some(1)).unwrap();
        assert_eq!(summary.line_count, 3);
        assert_eq!(summary.total_tokens, 5);
        assert_eq!(summary.unique_unigrams, 3);
        assert_eq!(summary.unique_bigrams, 4);

        let rows = db.top_unigrams(summary.episode_id, 10).unwrap();
        let as_pairs: Vec<(String, i64)> = rows.into_iter().map(|u| (u.token, u.freq)).collect();
        assert_eq!(
            as_pairs,
            vec![("hello".to_string(), 2), ("world".to_string(), 2), ("big".to_string(), 1)]
        );
    }

    #[test]
    fn test_reindex_unchanged_file_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("t.db")).unwrap();
        let srt = temp.path().join("ep.srt");
        std::fs::write(&srt, THREE_LINES).unwrap();

        let first = index_file(&db, &srt, Some("Demo"), Some(1), Some(1)).unwrap();
        let uni_before = db.top_unigrams(first.episode_id, 100).unwrap();
        let bi_before = db.top_bigrams(first.episode_id, 100).unwrap();

        let second = index_file(&db, &srt, Some("Demo"), Some(1), Some(1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(db.top_unigrams(second.episode_id, 100).unwrap(), uni_before);
        assert_eq!(db.top_bigrams(second.episode_id, 100).unwrap(), bi_before);
    }

    #[test]
    fn test_preview_does_not_touch_store() {
        let temp = TempDir::new().unwrap();
        let srt = temp.path().join("ep.srt");
        std::fs::write(&srt, THREE_LINES).unwrap();

        let counts = token_counts_from_file(&srt, 2).unwrap();
        assert_eq!(counts.total_lines, 3);
        assert_eq!(counts.total_tokens, 5);
        assert_eq!(counts.vocab_size, 3);
        assert_eq!(counts.top.len(), 2);
    }

    #[test]
    fn test_rebuild_document_frequencies() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("t.db")).unwrap();
        let a = temp.path().join("a.srt");
        let b = temp.path().join("b.srt");
        std::fs::write(&a, "Hello world\n").unwrap();
        std::fs::write(&b, "Hello vampire\n").unwrap();
        index_file(&db, &a, Some("A"), None, None).unwrap();
        index_file(&db, &b, Some("B"), None, None).unwrap();

        let summary = rebuild_document_frequencies(&db).unwrap();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.tokens, 3);

        let hello = db.get_token_stat("hello").unwrap().unwrap();
        assert_eq!(hello.df, 2);
        assert!(hello.idf.abs() < 1e-9);
        let vampire = db.get_token_stat("vampire").unwrap().unwrap();
        assert!((vampire.idf - 2f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("t.db")).unwrap();
        let result = index_file(&db, &temp.path().join("missing.srt"), None, None, None);
        assert!(result.is_err());
        assert_eq!(db.get_stats().unwrap().episodes, 0);
    }
}
