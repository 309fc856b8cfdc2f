pub mod models;


use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use models::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on the frequency store.
///
/// Holds only the database location: every operation opens its own
/// connection and drops it on return, so nothing is shared between calls.
#[derive(Debug, Clone)]
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let db = Self {
            db_path: db_path.to_path_buf(),
        };

        let conn = db.connect()?;
        // WAL is persistent, so setting it once is enough
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        ",
        )?;
        Self::init_schema(&conn)?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        // Unicode-aware lowercase; SQLite's lower() only folds ASCII
        conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let s: Option<String> = ctx.get(0)?;
                Ok(s.map(|s| s.to_lowercase()))
            },
        )?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                show_name TEXT,
                season INTEGER,
                episode INTEGER,
                file_path TEXT UNIQUE NOT NULL,
                indexed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_episodes_show_season_ep
                ON episodes(show_name, season, episode);

            CREATE TABLE IF NOT EXISTS unigram_counts (
                episode_id INTEGER NOT NULL,
                token TEXT NOT NULL,
                freq INTEGER NOT NULL CHECK (freq >= 1),
                PRIMARY KEY (episode_id, token),
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_unigrams_token ON unigram_counts(token);

            CREATE TABLE IF NOT EXISTS bigram_counts (
                episode_id INTEGER NOT NULL,
                token1 TEXT NOT NULL,
                token2 TEXT NOT NULL,
                freq INTEGER NOT NULL CHECK (freq >= 1),
                PRIMARY KEY (episode_id, token1, token2),
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_bigrams_t1_t2 ON bigram_counts(token1, token2);

            -- Corpus-wide statistics, rebuilt in bulk
            CREATE TABLE IF NOT EXISTS token_df (
                token TEXT PRIMARY KEY,
                df INTEGER NOT NULL,
                idf REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_ratings (
                user_id TEXT NOT NULL,
                show_name TEXT NOT NULL,
                rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
                PRIMARY KEY (user_id, show_name)
            );

            CREATE INDEX IF NOT EXISTS idx_user_ratings_user ON user_ratings(user_id);
            CREATE INDEX IF NOT EXISTS idx_user_ratings_show ON user_ratings(show_name);
        "#,
        )?;
        Ok(())
    }

    /// Liveness probe: can a connection be opened and queried.
    pub fn check_db(&self) -> bool {
        self.connect()
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(Into::into)
            })
            .is_ok()
    }

    // =========================================================================
    // Episodes and frequency tables
    // =========================================================================

    /// Persist the counts of one episode in a single transaction.
    ///
    /// The episode row is upserted on `file_path` (metadata left as `None`
    /// keeps its stored value). Previous unigram/bigram rows of the episode
    /// are purged before the new counts are upserted, so the stored
    /// vocabulary always mirrors the latest file content.
    pub fn store_episode_counts(
        &self,
        meta: &EpisodeMeta,
        unigrams: &BTreeMap<String, i64>,
        bigrams: &BTreeMap<(String, String), i64>,
    ) -> Result<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let now = chrono::Utc::now().to_rfc3339();
        let episode_id: i64 = tx.query_row(
            "INSERT INTO episodes (show_name, season, episode, file_path, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (file_path) DO UPDATE SET
                show_name = COALESCE(excluded.show_name, episodes.show_name),
                season = COALESCE(excluded.season, episodes.season),
                episode = COALESCE(excluded.episode, episodes.episode),
                indexed_at = excluded.indexed_at
             RETURNING id",
            params![meta.show_name, meta.season, meta.episode, meta.file_path, now],
            |row| row.get(0),
        )?;

        tx.execute(
            "DELETE FROM unigram_counts WHERE episode_id = ?1",
            params![episode_id],
        )?;
        tx.execute(
            "DELETE FROM bigram_counts WHERE episode_id = ?1",
            params![episode_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO unigram_counts (episode_id, token, freq)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (episode_id, token) DO UPDATE SET freq = excluded.freq",
            )?;
            for (token, freq) in unigrams {
                stmt.execute(params![episode_id, token, freq])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO bigram_counts (episode_id, token1, token2, freq)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (episode_id, token1, token2) DO UPDATE SET freq = excluded.freq",
            )?;
            for ((t1, t2), freq) in bigrams {
                stmt.execute(params![episode_id, t1, t2, freq])?;
            }
        }

        tx.commit()?;
        Ok(episode_id)
    }

    pub fn get_episode_by_id(&self, id: i64) -> Result<Option<Episode>> {
        let conn = self.connect()?;
        let episode = conn
            .query_row(
                "SELECT id, show_name, season, episode, file_path, indexed_at
                 FROM episodes WHERE id = ?1",
                params![id],
                map_episode,
            )
            .optional()?;
        Ok(episode)
    }

    pub fn get_episode_by_path(&self, file_path: &str) -> Result<Option<Episode>> {
        let conn = self.connect()?;
        let episode = conn
            .query_row(
                "SELECT id, show_name, season, episode, file_path, indexed_at
                 FROM episodes WHERE file_path = ?1",
                params![file_path],
                map_episode,
            )
            .optional()?;
        Ok(episode)
    }

    /// Top unigrams of an episode, most frequent first.
    pub fn top_unigrams(&self, episode_id: i64, limit: i64) -> Result<Vec<UnigramCount>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT token, freq FROM unigram_counts
             WHERE episode_id = ?1
             ORDER BY freq DESC, token ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![episode_id, limit], |row| {
                Ok(UnigramCount {
                    token: row.get(0)?,
                    freq: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Top bigrams of an episode, most frequent first.
    pub fn top_bigrams(&self, episode_id: i64, limit: i64) -> Result<Vec<BigramCount>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT token1, token2, freq FROM bigram_counts
             WHERE episode_id = ?1
             ORDER BY freq DESC, token1 ASC, token2 ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![episode_id, limit], |row| {
                Ok(BigramCount {
                    token1: row.get(0)?,
                    token2: row.get(1)?,
                    freq: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        let conn = self.connect()?;
        let stats = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM episodes),
                (SELECT COUNT(DISTINCT fold_case(COALESCE(show_name, ''))) FROM episodes),
                (SELECT COUNT(*) FROM unigram_counts),
                (SELECT COUNT(*) FROM bigram_counts),
                (SELECT COUNT(*) FROM token_df)",
            [],
            |row| {
                Ok(IndexStats {
                    episodes: row.get(0)?,
                    shows: row.get(1)?,
                    unigram_rows: row.get(2)?,
                    bigram_rows: row.get(3)?,
                    df_tokens: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    // =========================================================================
    // Document frequency
    // =========================================================================

    /// Replace `token_df` with statistics recomputed from `unigram_counts`:
    /// `df` is the number of episodes containing the token and
    /// `idf = ln(N / df)` with `N` the number of episodes.
    pub fn rebuild_token_df(&self) -> Result<DfSummary> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let documents: i64 = tx.query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))?;

        let dfs = {
            let mut stmt = tx.prepare(
                "SELECT token, COUNT(DISTINCT episode_id) FROM unigram_counts GROUP BY token",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        tx.execute("DELETE FROM token_df", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO token_df (token, df, idf) VALUES (?1, ?2, ?3)")?;
            for (token, df) in &dfs {
                stmt.execute(params![token, df, inverse_document_frequency(documents, *df)])?;
            }
        }
        tx.commit()?;

        Ok(DfSummary {
            documents,
            tokens: dfs.len() as i64,
        })
    }

    /// Upsert externally computed statistics, e.g. from an out-of-band df job.
    pub fn upsert_token_stats(&self, stats: &[TokenStat]) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO token_df (token, df, idf) VALUES (?1, ?2, ?3)
                 ON CONFLICT (token) DO UPDATE SET df = excluded.df, idf = excluded.idf",
            )?;
            for stat in stats {
                stmt.execute(params![stat.token, stat.df, stat.idf])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_token_stat(&self, token: &str) -> Result<Option<TokenStat>> {
        let conn = self.connect()?;
        let stat = conn
            .query_row(
                "SELECT token, df, idf FROM token_df WHERE token = ?1",
                params![token],
                |row| {
                    Ok(TokenStat {
                        token: row.get(0)?,
                        df: row.get(1)?,
                        idf: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(stat)
    }

    // =========================================================================
    // Search retrieval
    // =========================================================================

    /// Episodes containing every token, scored by `sum(freq * idf)`.
    pub fn and_candidates(&self, tokens: &[String], limit: usize) -> Result<Vec<Candidate>> {
        self.query_candidates(tokens, limit, MatchType::And)
    }

    /// Episodes containing at least one token, best coverage first.
    pub fn or_candidates(&self, tokens: &[String], limit: usize) -> Result<Vec<Candidate>> {
        self.query_candidates(tokens, limit, MatchType::Or)
    }

    fn query_candidates(
        &self,
        tokens: &[String],
        limit: usize,
        match_type: MatchType,
    ) -> Result<Vec<Candidate>> {
        let mut distinct: Vec<&String> = tokens.iter().collect();
        distinct.sort();
        distinct.dedup();
        if distinct.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let (having, order_by) = match match_type {
            MatchType::And => ("HAVING COUNT(DISTINCT u.token) = ?", "tfidf DESC, e.id ASC"),
            MatchType::Or => ("", "matched_terms DESC, tfidf DESC, e.id ASC"),
        };

        let sql = format!(
            "SELECT e.id, COALESCE(e.show_name, ''), e.season, e.episode, e.file_path,
                    COUNT(DISTINCT u.token) AS matched_terms,
                    SUM(u.freq * COALESCE(t.idf, 0.0)) AS tfidf
             FROM unigram_counts u
             JOIN episodes e ON e.id = u.episode_id
             LEFT JOIN token_df t ON t.token = u.token
             WHERE u.token IN ({})
             GROUP BY e.id
             {}
             ORDER BY {}
             LIMIT ?",
            placeholders(distinct.len()),
            having,
            order_by
        );

        let mut values: Vec<Value> = distinct.iter().map(|t| Value::Text((*t).clone())).collect();
        if match_type == MatchType::And {
            values.push(Value::Integer(distinct.len() as i64));
        }
        values.push(Value::Integer(limit as i64));

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(Candidate {
                    episode_id: row.get(0)?,
                    show_name: row.get(1)?,
                    season: row.get(2)?,
                    episode: row.get(3)?,
                    file_path: row.get(4)?,
                    matched_terms: row.get(5)?,
                    score: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                    match_type,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sum of stored bigram frequencies per episode over the given pairs.
    /// Episodes without any matching pair are absent from the map.
    pub fn bigram_frequencies(
        &self,
        episode_ids: &[i64],
        pairs: &[(String, String)],
    ) -> Result<HashMap<i64, i64>> {
        if episode_ids.is_empty() || pairs.is_empty() {
            return Ok(HashMap::new());
        }

        let pair_clause = vec!["(token1 = ? AND token2 = ?)"; pairs.len()].join(" OR ");
        let sql = format!(
            "SELECT episode_id, SUM(freq) FROM bigram_counts
             WHERE episode_id IN ({}) AND ({})
             GROUP BY episode_id",
            placeholders(episode_ids.len()),
            pair_clause
        );

        let mut values: Vec<Value> = episode_ids.iter().map(|id| Value::Integer(*id)).collect();
        for (t1, t2) in pairs {
            values.push(Value::Text(t1.clone()));
            values.push(Value::Text(t2.clone()));
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let boosts = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(boosts)
    }

    // =========================================================================
    // Ratings
    // =========================================================================

    /// Insert or replace a rating. The show name is stored case-folded.
    pub fn upsert_rating(&self, user_id: &str, show_name: &str, rating: i64) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO user_ratings (user_id, show_name, rating)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, show_name) DO UPDATE SET rating = excluded.rating",
            params![user_id, show_name.to_lowercase(), rating],
        )?;
        Ok(())
    }

    /// All ratings of a user, alphabetical by show.
    pub fn get_ratings(&self, user_id: &str) -> Result<Vec<UserRating>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT show_name, rating FROM user_ratings
             WHERE user_id = ?1
             ORDER BY show_name",
        )?;
        let rows = stmt
            .query_map(params![user_id], map_rating)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Shows rated at least `min_rating`, best rated first.
    pub fn liked_shows(&self, user_id: &str, min_rating: i64) -> Result<Vec<UserRating>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT show_name, rating FROM user_ratings
             WHERE user_id = ?1 AND rating >= ?2
             ORDER BY rating DESC, show_name ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id, min_rating], map_rating)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // =========================================================================
    // Recommendation statistics
    // =========================================================================

    /// Per (show, token) `sum(freq * idf)` for the given case-folded shows,
    /// restricted to tokens whose idf lies in `[idf_min, idf_max]`.
    pub fn show_token_weights(
        &self,
        shows: &[String],
        idf_min: f64,
        idf_max: f64,
    ) -> Result<Vec<ShowTokenWeight>> {
        if shows.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT fold_case(COALESCE(e.show_name, '')) AS show, u.token, t.idf,
                    SUM(u.freq * t.idf) AS weight
             FROM episodes e
             JOIN unigram_counts u ON u.episode_id = e.id
             JOIN token_df t ON t.token = u.token
             WHERE fold_case(COALESCE(e.show_name, '')) IN ({})
               AND t.idf BETWEEN ? AND ?
             GROUP BY show, u.token
             ORDER BY show ASC, weight DESC, u.token ASC",
            placeholders(shows.len())
        );

        let mut values: Vec<Value> = shows.iter().map(|s| Value::Text(s.clone())).collect();
        values.push(Value::Real(idf_min));
        values.push(Value::Real(idf_max));

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(ShowTokenWeight {
                    show_name: row.get(0)?,
                    token: row.get(1)?,
                    idf: row.get(2)?,
                    weight: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Per case-folded show, `sum(freq * idf)` over the given tokens.
    /// Shows sharing none of the tokens are absent.
    pub fn show_scores_for_tokens(&self, tokens: &[String]) -> Result<Vec<ShowScore>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT fold_case(COALESCE(e.show_name, '')) AS show, SUM(u.freq * t.idf) AS score
             FROM episodes e
             JOIN unigram_counts u ON u.episode_id = e.id
             JOIN token_df t ON t.token = u.token
             WHERE u.token IN ({})
             GROUP BY show",
            placeholders(tokens.len())
        );

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(tokens.iter()), |row| {
                Ok(ShowScore {
                    show_name: row.get(0)?,
                    score: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// `ln(N / df)`; zero for degenerate inputs.
pub fn inverse_document_frequency(documents: i64, df: i64) -> f64 {
    if documents <= 0 || df <= 0 {
        return 0.0;
    }
    (documents as f64 / df as f64).ln()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn map_episode(row: &rusqlite::Row<'_>) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        show_name: row.get(1)?,
        season: row.get(2)?,
        episode: row.get(3)?,
        file_path: row.get(4)?,
        indexed_at: row.get(5)?,
    })
}

fn map_rating(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRating> {
    Ok(UserRating {
        show_name: row.get(0)?,
        rating: row.get(1)?,
    })
}
