use crate::textprep;
use std::collections::HashMap;

/// How many keywords `extract_keywords` returns.
pub const MAX_KEYWORDS: usize = 6;

const STOP_WORDS: &[&str] = &[
    "this",
    "that",
    "with",
    "from",
    "they",
    "have",
    "will",
    "would",
    "could",
    "should",
    "about",
    "there",
    "their",
    "which",
    "were",
    "been",
    "into",
    "after",
    "before",
    "because",
    "while",
    "however",
    "therefore",
];

fn is_candidate(tok: &str) -> bool {
    tok.chars().count() > 3 && !STOP_WORDS.contains(&tok)
}

/// Top keywords by frequency; ties keep first-occurrence order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let scrubbed = textprep::scrub(text);
    // (count, first_seen)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for tok in scrubbed.split_whitespace().filter(|t| is_candidate(t)) {
        let seen = order.len();
        let e = counts.entry(tok).or_insert_with(|| {
            order.push(tok);
            (0, seen)
        });
        e.0 += 1;
    }
    // `order` is first-occurrence order; a stable sort by count keeps it for ties.
    order.sort_by(|a, b| counts[b].0.cmp(&counts[a].0));
    order
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}
