//! Offline corroboration hints: a static outlet table, never live search results.

use crate::keywords::extract_keywords;
use factlens_core::{Category, SourceKind, SourceSuggestion};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
pub struct Outlet {
    pub name: &'static str,
    pub base: &'static str,
    pub bonus: u32,
}

pub const OUTLETS: &[Outlet] = &[
    Outlet { name: "Reuters", base: "https://www.reuters.com", bonus: 30 },
    Outlet { name: "AP News", base: "https://apnews.com", bonus: 30 },
    Outlet { name: "BBC News", base: "https://www.bbc.com", bonus: 30 },
    Outlet { name: "Snopes", base: "https://www.snopes.com", bonus: 30 },
    Outlet { name: "PolitiFact", base: "https://www.politifact.com", bonus: 30 },
    Outlet { name: "WHO", base: "https://www.who.int", bonus: 30 },
    Outlet { name: "PubMed", base: "https://pubmed.ncbi.nlm.nih.gov", bonus: 30 },
];

const SUGGESTED_OUTLETS: usize = 3;
const QUERY_KEYWORDS: usize = 4;
const OUTLET_REASON: &str =
    "Authoritative outlet; encourages cross-corroboration; HTTPS and transparent masthead";

#[derive(Debug, Clone)]
pub struct Suggestions {
    pub suggestions: Vec<SourceSuggestion>,
    /// Whether any suggestion is backed by live corroboration. Always false offline.
    pub strong: bool,
}

pub fn outlet_reliability(o: &Outlet) -> u8 {
    (80.0 + f64::from(o.bonus) / 3.0).round().clamp(0.0, 100.0) as u8
}

fn keyword_phrase(text: &str) -> String {
    let kws = extract_keywords(text);
    kws.into_iter()
        .take(QUERY_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Propose reputable outlets for cross-checking the text.
///
/// `url` and `flags` are accepted so callers can pass the full context; the offline table
/// does not vary on them.
pub fn suggest_sources(
    text: &str,
    _url: &str,
    title: &str,
    _flags: &BTreeSet<Category>,
) -> Suggestions {
    let basis = if title.trim().is_empty() { text } else { title };
    let kws = keyword_phrase(basis);
    let topic = if kws.is_empty() { "topic" } else { kws.as_str() };

    let suggestions = OUTLETS
        .iter()
        .take(SUGGESTED_OUTLETS)
        .map(|o| SourceSuggestion {
            title: format!("{} coverage related to: {topic}", o.name),
            url: o.base.to_string(),
            reliability_score: outlet_reliability(o),
            reason: OUTLET_REASON.to_string(),
            evidence_snippet: None,
            kind: SourceKind::Secondary,
        })
        .collect();

    Suggestions {
        suggestions,
        strong: false,
    }
}

/// Canned search-engine queries scoped to reputable domains.
pub fn make_search_queries(text: &str) -> Vec<String> {
    let q = keyword_phrase(text);
    vec![
        format!("{q} site:reuters.com OR site:apnews.com OR site:bbc.com"),
        format!("{q} site:snopes.com OR site:politifact.com"),
    ]
}

/// Mean suggestion reliability, or 50 with nothing to average.
pub fn score_reliability(suggestions: &[SourceSuggestion]) -> u8 {
    if suggestions.is_empty() {
        return 50;
    }
    let sum: f64 = suggestions
        .iter()
        .map(|s| f64::from(s.reliability_score))
        .sum();
    (sum / suggestions.len() as f64).round().clamp(0.0, 100.0) as u8
}
