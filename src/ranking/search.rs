use crate::config::RankingConfig;
use crate::database::{Candidate, MatchType};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// How a normalized query is retrieved and boosted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    /// Distinct tokens sent to retrieval, in first-seen order
    pub tokens: Vec<String>,
    /// Single-word queries skip the AND pass and run OR over the variants
    pub variant_or: bool,
    /// Adjacent pairs of the query as typed, used for the phrase boost
    pub phrase_bigrams: Vec<(String, String)>,
}

/// Singular/plural counterpart set of a single token: a trailing `s` is
/// stripped when at least two characters remain, otherwise one is added.
pub fn number_variants(token: &str) -> Vec<String> {
    let mut variants = vec![token.to_string()];
    match token.strip_suffix('s') {
        Some(stem) => {
            if stem.chars().count() > 1 {
                variants.push(stem.to_string());
            }
        }
        None => variants.push(format!("{}s", token)),
    }
    variants
}

/// Build the retrieval plan for already-normalized query tokens.
/// Returns `None` when there is nothing to search for.
pub fn plan_query(query_tokens: &[String]) -> Option<QueryPlan> {
    match query_tokens {
        [] => None,
        [single] => Some(QueryPlan {
            tokens: number_variants(single),
            variant_or: true,
            phrase_bigrams: Vec::new(),
        }),
        _ => {
            let mut seen = HashSet::new();
            let tokens = query_tokens
                .iter()
                .filter(|t| seen.insert(t.as_str()))
                .cloned()
                .collect();

            let mut seen_pairs = HashSet::new();
            let phrase_bigrams = query_tokens
                .windows(2)
                .map(|w| (w[0].clone(), w[1].clone()))
                .filter(|pair| seen_pairs.insert(pair.clone()))
                .collect();

            Some(QueryPlan {
                tokens,
                variant_or: false,
                phrase_bigrams,
            })
        }
    }
}

/// AND hits first, then OR hits not already present, capped at `pool_size`.
pub fn merge_candidates(
    and_rows: Vec<Candidate>,
    or_rows: Vec<Candidate>,
    pool_size: usize,
) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = and_rows.into_iter().take(pool_size).collect();
    let seen: HashSet<i64> = merged.iter().map(|c| c.episode_id).collect();
    let remaining = pool_size.saturating_sub(merged.len());

    merged.extend(
        or_rows
            .into_iter()
            .filter(|c| !seen.contains(&c.episode_id))
            .take(remaining),
    );
    merged
}

/// Add `factor * bigram frequency` to every candidate found in `bigram_freqs`.
pub fn apply_phrase_boost(candidates: &mut [Candidate], bigram_freqs: &HashMap<i64, i64>, factor: f64) {
    for candidate in candidates.iter_mut() {
        if let Some(freq) = bigram_freqs.get(&candidate.episode_id) {
            candidate.score += factor * (*freq).max(0) as f64;
        }
    }
}

fn match_rank(match_type: MatchType) -> u8 {
    match match_type {
        MatchType::And => 0,
        MatchType::Or => 1,
    }
}

/// AND before OR, then score descending, then episode id ascending.
pub fn primary_order(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        match_rank(a.match_type)
            .cmp(&match_rank(b.match_type))
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.episode_id.cmp(&b.episode_id))
    });
}

/// Aggregate score of one show over the candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesScore {
    pub show_name: String,
    pub score: f64,
    /// Highest-scoring candidate of the show
    pub representative: Candidate,
}

/// Sum candidate scores per show plus `coverage_bonus * matched_terms` for
/// each candidate. Shows come back in order of first appearance.
pub fn aggregate_series(candidates: &[Candidate], coverage_bonus: f64) -> Vec<SeriesScore> {
    let mut series: Vec<SeriesScore> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for candidate in candidates {
        let bonus = coverage_bonus * candidate.matched_terms as f64;
        match position.get(candidate.show_name.as_str()) {
            Some(&idx) => {
                let entry = &mut series[idx];
                entry.score += candidate.score + bonus;
                if candidate.score > entry.representative.score {
                    entry.representative = candidate.clone();
                }
            }
            None => {
                position.insert(candidate.show_name.as_str(), series.len());
                series.push(SeriesScore {
                    show_name: candidate.show_name.clone(),
                    score: candidate.score + bonus,
                    representative: candidate.clone(),
                });
            }
        }
    }
    series
}

/// Diversity rerank over primary-ordered candidates: representatives of the
/// `top_series` best shows go first, the rest of the slots are filled in
/// primary order. At most one episode per show.
pub fn select_diverse(candidates: &[Candidate], config: &RankingConfig) -> Vec<Candidate> {
    let mut series = aggregate_series(candidates, config.coverage_bonus);
    // stable: equal scores keep first-appearance order
    series.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let limit = config.result_limit;
    let mut results: Vec<Candidate> = Vec::with_capacity(limit);
    let mut seen_shows: HashSet<String> = HashSet::new();

    for s in series.into_iter().take(config.top_series) {
        if results.len() >= limit {
            break;
        }
        if seen_shows.insert(s.show_name.clone()) {
            results.push(s.representative);
        }
    }

    for candidate in candidates {
        if results.len() >= limit {
            break;
        }
        if seen_shows.insert(candidate.show_name.clone()) {
            results.push(candidate.clone());
        }
    }

    results
}

/// Phrase boost, primary ordering and diversity selection in one pass.
pub fn rank_candidates(
    mut candidates: Vec<Candidate>,
    bigram_freqs: &HashMap<i64, i64>,
    config: &RankingConfig,
) -> Vec<Candidate> {
    apply_phrase_boost(&mut candidates, bigram_freqs, config.phrase_boost);
    primary_order(&mut candidates);
    select_diverse(&candidates, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: i64, show: &str, score: f64, matched: i64, match_type: MatchType) -> Candidate {
        Candidate {
            episode_id: id,
            show_name: show.to_string(),
            season: Some(1),
            episode: Some(id),
            file_path: format!("/{}/{}.srt", show, id),
            matched_terms: matched,
            score,
            match_type,
        }
    }

    fn toks(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn ids(cands: &[Candidate]) -> Vec<i64> {
        cands.iter().map(|c| c.episode_id).collect()
    }

    // ── query planning ────────────────────────────────────────────────────

    #[test]
    fn test_single_token_expands_to_plural() {
        let plan = plan_query(&toks(&["vampire"])).unwrap();
        assert_eq!(plan.tokens, toks(&["vampire", "vampires"]));
        assert!(plan.variant_or);
        assert!(plan.phrase_bigrams.is_empty());
    }

    #[test]
    fn test_single_token_expands_to_singular() {
        let plan = plan_query(&toks(&["zombies"])).unwrap();
        assert_eq!(plan.tokens, toks(&["zombies", "zombie"]));
        assert!(plan.variant_or);
    }

    #[test]
    fn test_short_plural_not_stripped() {
        assert_eq!(number_variants("os"), toks(&["os"]));
        assert_eq!(number_variants("ups"), toks(&["ups", "up"]));
    }

    #[test]
    fn test_empty_query_has_no_plan() {
        assert!(plan_query(&[]).is_none());
    }

    #[test]
    fn test_multi_token_plan_keeps_phrase_order() {
        let plan = plan_query(&toks(&["winter", "coming", "winter", "coming"])).unwrap();
        assert!(!plan.variant_or);
        assert_eq!(plan.tokens, toks(&["winter", "coming"]));
        assert_eq!(
            plan.phrase_bigrams,
            vec![
                ("winter".to_string(), "coming".to_string()),
                ("coming".to_string(), "winter".to_string()),
            ]
        );
    }

    // ── candidate merge ───────────────────────────────────────────────────

    #[test]
    fn test_merge_fills_pool_with_unseen_or_rows() {
        let and_rows = vec![cand(1, "a", 5.0, 2, MatchType::And)];
        let or_rows = vec![
            cand(1, "a", 5.0, 2, MatchType::Or),
            cand(2, "b", 4.0, 1, MatchType::Or),
            cand(3, "c", 3.0, 1, MatchType::Or),
        ];
        let merged = merge_candidates(and_rows, or_rows, 2);
        assert_eq!(ids(&merged), vec![1, 2]);
        assert_eq!(merged[0].match_type, MatchType::And);
        assert_eq!(merged[1].match_type, MatchType::Or);
    }

    #[test]
    fn test_merge_full_and_pool_skips_or() {
        let and_rows = vec![cand(1, "a", 5.0, 2, MatchType::And), cand(2, "b", 4.0, 2, MatchType::And)];
        let or_rows = vec![cand(3, "c", 9.0, 1, MatchType::Or)];
        assert_eq!(ids(&merge_candidates(and_rows, or_rows, 2)), vec![1, 2]);
    }

    // ── boost and ordering ────────────────────────────────────────────────

    #[test]
    fn test_phrase_boost_never_decreases_scores() {
        let mut cands = vec![cand(1, "a", 1.0, 2, MatchType::And), cand(2, "b", 3.0, 2, MatchType::And)];
        let before: Vec<f64> = cands.iter().map(|c| c.score).collect();
        let freqs = HashMap::from([(1, 3), (2, 0)]);
        apply_phrase_boost(&mut cands, &freqs, 2.0);

        assert_eq!(cands[0].score, 7.0);
        assert_eq!(cands[1].score, 3.0);
        for (c, b) in cands.iter().zip(before) {
            assert!(c.score >= b);
        }
    }

    #[test]
    fn test_primary_order_and_first_then_score_then_id() {
        let mut cands = vec![
            cand(5, "e", 100.0, 1, MatchType::Or),
            cand(4, "d", 2.0, 2, MatchType::And),
            cand(3, "c", 7.0, 2, MatchType::And),
            cand(2, "b", 2.0, 2, MatchType::And),
        ];
        primary_order(&mut cands);
        assert_eq!(ids(&cands), vec![3, 2, 4, 5]);
    }

    // ── series aggregation and diversity ──────────────────────────────────

    #[test]
    fn test_aggregate_series_sums_with_coverage_bonus() {
        let cands = vec![
            cand(1, "buffy", 4.0, 2, MatchType::And),
            cand(2, "angel", 3.0, 1, MatchType::Or),
            cand(3, "buffy", 6.0, 1, MatchType::Or),
        ];
        let series = aggregate_series(&cands, 0.1);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].show_name, "buffy");
        assert!((series[0].score - (4.0 + 0.2 + 6.0 + 0.1)).abs() < 1e-9);
        assert_eq!(series[0].representative.episode_id, 3);
        assert_eq!(series[1].show_name, "angel");
    }

    #[test]
    fn test_select_diverse_promotes_top_series() {
        let config = RankingConfig::default();
        // primary order: show "a" has one strong AND hit, show "b" many OR hits
        let cands = vec![
            cand(1, "a", 10.0, 2, MatchType::And),
            cand(2, "c", 9.0, 2, MatchType::And),
            cand(3, "b", 6.0, 1, MatchType::Or),
            cand(4, "b", 6.0, 1, MatchType::Or),
            cand(5, "d", 1.0, 1, MatchType::Or),
            cand(6, "e", 0.5, 1, MatchType::Or),
            cand(7, "f", 0.4, 1, MatchType::Or),
        ];
        let results = select_diverse(&cands, &config);
        // b aggregates 12.2 and comes first, then a (10.2) and c (9.2)
        assert_eq!(ids(&results), vec![3, 1, 2, 5, 6]);
    }

    #[test]
    fn test_select_diverse_one_episode_per_show() {
        let config = RankingConfig::default();
        let cands: Vec<Candidate> = (1..=20)
            .map(|i| cand(i, ["x", "y", "z"][(i % 3) as usize], 20.0 - i as f64, 1, MatchType::Or))
            .collect();
        let results = select_diverse(&cands, &config);
        assert_eq!(results.len(), 3);
        let shows: HashSet<&str> = results.iter().map(|c| c.show_name.as_str()).collect();
        assert_eq!(shows.len(), 3);
    }

    #[test]
    fn test_select_diverse_respects_result_limit() {
        let config = RankingConfig::default();
        let cands: Vec<Candidate> = (1..=10)
            .map(|i| cand(i, &format!("show{}", i), 100.0 - i as f64, 1, MatchType::Or))
            .collect();
        let results = select_diverse(&cands, &config);
        assert_eq!(ids(&results), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rank_empty_pool() {
        let results = rank_candidates(Vec::new(), &HashMap::new(), &RankingConfig::default());
        assert!(results.is_empty());
    }

    #[test]
    fn test_phrase_boost_can_reorder() {
        let config = RankingConfig::default();
        let cands = vec![
            cand(1, "a", 5.0, 2, MatchType::And),
            cand(2, "b", 4.0, 2, MatchType::And),
        ];
        let freqs = HashMap::from([(2, 1)]);
        let results = rank_candidates(cands, &freqs, &config);
        assert_eq!(ids(&results), vec![2, 1]);
        assert_eq!(results[0].score, 6.0);
    }
}
