use crate::config::RecommendConfig;
use crate::database::{ShowScore, ShowTokenWeight};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Tokens eligible as taste markers: plain lowercase ASCII words of at
/// least `min_len` letters.
pub fn is_vocabulary_token(token: &str, min_len: usize) -> bool {
    token.len() >= min_len && token.bytes().all(|b| b.is_ascii_lowercase())
}

fn in_idf_window(idf: f64, config: &RecommendConfig) -> bool {
    idf >= config.idf_min && idf <= config.idf_max
}

/// Best-weighted tokens of every show, after the shape and idf filters.
/// Ties on weight fall back to token order.
pub fn top_tokens_per_show(
    weights: &[ShowTokenWeight],
    config: &RecommendConfig,
) -> BTreeMap<String, Vec<ShowTokenWeight>> {
    let mut per_show: BTreeMap<String, Vec<ShowTokenWeight>> = BTreeMap::new();
    for w in weights {
        if is_vocabulary_token(&w.token, config.min_token_len) && in_idf_window(w.idf, config) {
            per_show.entry(w.show_name.clone()).or_default().push(w.clone());
        }
    }

    for tokens in per_show.values_mut() {
        tokens.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.token.cmp(&b.token)));
        tokens.truncate(config.top_tokens_per_show);
    }
    per_show
}

/// Union of the retained tokens across shows, deduplicated and sorted.
pub fn favorite_tokens(top: &BTreeMap<String, Vec<ShowTokenWeight>>) -> Vec<String> {
    top.values()
        .flatten()
        .map(|w| w.token.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Drop liked shows, order by score descending then name, cap at `limit`.
pub fn rank_recommendations(
    scores: Vec<ShowScore>,
    liked: &HashSet<String>,
    limit: usize,
) -> Vec<ShowScore> {
    let mut ranked: Vec<ShowScore> = scores
        .into_iter()
        .filter(|s| !liked.contains(&s.show_name))
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.show_name.cmp(&b.show_name))
    });
    ranked.truncate(limit);
    ranked
}
