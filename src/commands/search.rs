use super::{elapsed_ms, require_non_blank};
use crate::config::RankingConfig;
use crate::database::{Candidate, Database};
use crate::error::AppError;
use crate::ranking::search::{merge_candidates, plan_query, rank_candidates};
use crate::text::normalize_line;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Tokens actually retrieved, including singular/plural variants
    pub tokens: Vec<String>,
    pub time_ms: f64,
    pub results: Vec<Candidate>,
}

/// Free-text episode search: at most `result_limit` episodes, one per show.
pub fn search(db: &Database, query: &str, config: &RankingConfig) -> Result<SearchResponse, AppError> {
    let start = Instant::now();
    require_non_blank("query", query)?;
    log::info!("search called with query: {:?}", query);

    let Some(plan) = plan_query(&normalize_line(query)) else {
        log::info!("search: query {:?} has no searchable tokens", query);
        return Ok(SearchResponse {
            query: query.to_string(),
            tokens: Vec::new(),
            time_ms: elapsed_ms(start),
            results: Vec::new(),
        });
    };

    let pool = config.candidate_pool_size;
    let candidates = if plan.variant_or {
        db.or_candidates(&plan.tokens, pool)?
    } else {
        let and_rows = db.and_candidates(&plan.tokens, pool)?;
        let remaining = pool.saturating_sub(and_rows.len());
        let or_rows = if remaining > 0 {
            db.or_candidates(&plan.tokens, pool)?
        } else {
            Vec::new()
        };
        merge_candidates(and_rows, or_rows, pool)
    };

    let bigram_freqs = if plan.phrase_bigrams.is_empty() || candidates.is_empty() {
        HashMap::new()
    } else {
        let ids: Vec<i64> = candidates.iter().map(|c| c.episode_id).collect();
        db.bigram_frequencies(&ids, &plan.phrase_bigrams)?
    };

    let pool_size = candidates.len();
    let results = rank_candidates(candidates, &bigram_freqs, config);
    for r in &results {
        log::debug!(
            "  {} #{} {} ({:.2}, {} terms)",
            r.match_type,
            r.episode_id,
            r.show_name,
            r.score,
            r.matched_terms
        );
    }
    let time_ms = elapsed_ms(start);
    log::info!(
        "search {:?}: {} candidates, {} results in {} ms",
        query,
        pool_size,
        results.len(),
        time_ms
    );

    Ok(SearchResponse {
        query: query.to_string(),
        tokens: plan.tokens,
        time_ms,
        results,
    })
}
