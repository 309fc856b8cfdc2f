use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// French and English function words dropped from every token stream.
/// Entries are in their accent-stripped form since accents are removed
/// before filtering.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // FR
        "a", "ai", "aie", "aient", "ait", "alors", "au", "aux", "avec", "car", "ce", "cela",
        "ces", "cet", "cette", "ceci", "comme", "d", "dans", "de", "des", "du", "elle", "elles",
        "en", "et", "eu", "est", "etait", "ete", "etre", "il", "ils", "je", "la", "le", "les",
        "leur", "lui", "ma", "mais", "me", "meme", "mes", "moi", "mon", "ne", "nos", "notre",
        "nous", "on", "ou", "par", "pas", "pour", "qu", "que", "qui", "sa", "se", "ses", "si",
        "son", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "vos", "votre", "vous",
        "y",
        // EN
        "an", "the", "and", "or", "but", "if", "in", "at", "to", "of", "for", "is", "it", "its",
        "this", "that", "these", "those", "i", "you", "he", "she", "we", "they", "him", "her",
        "them", "my", "your", "his", "their", "our", "again",
    ]
    .into_iter()
    .collect()
});

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));
static PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"));

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Canonical decomposition followed by removal of combining marks (é -> e).
fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Turn one line of dialogue into clean tokens: lowercased, accent-free,
/// without digits or punctuation, stopwords removed and single-character
/// tokens dropped. Pure and deterministic.
pub fn normalize_line(line: &str) -> Vec<String> {
    let s = strip_accents(&line.to_lowercase());
    let s = DIGITS.replace_all(&s, " ");
    let s = PUNCT.replace_all(&s, " ");
    s.split_whitespace()
        .filter(|t| !is_stopword(t) && t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

pub fn normalize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<Vec<String>> {
    lines.iter().map(|l| normalize_line(l.as_ref())).collect()
}

/// `[[t1, t2], [t3]] -> [t1, t2, t3]`
pub fn flatten_tokens(per_line: Vec<Vec<String>>) -> Vec<String> {
    per_line.into_iter().flatten().collect()
}

/// Adjacent pairs over a token stream.
pub fn bigrams(tokens: &[String]) -> Vec<(String, String)> {
    tokens
        .windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect()
}

/// Vocabulary overview of a subtitle file, computed without touching the
/// store.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCounts {
    pub total_lines: usize,
    pub total_tokens: usize,
    pub vocab_size: usize,
    pub top: Vec<(String, u32)>,
}

pub fn token_counts<S: AsRef<str>>(lines: &[S], top_k: usize) -> TokenCounts {
    let tokens = flatten_tokens(normalize_lines(lines));
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for token in &tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut top: Vec<(String, u32)> = counts
        .iter()
        .map(|(t, c)| (t.to_string(), *c))
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(top_k);

    TokenCounts {
        total_lines: lines.len(),
        total_tokens: tokens.len(),
        vocab_size: counts.len(),
        top,
    }
}
