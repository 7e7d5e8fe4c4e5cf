//! Report aggregation: initial heuristics + highlights + bias + sources → one report.

use crate::bias::detect_bias;
use crate::highlight::find_highlights;
use crate::sources::{make_search_queries, score_reliability, suggest_sources};
use crate::textprep::{has_any_text, truncate_chars};
use factlens_core::{AnalysisReport, AnalysisRequest, Category, Highlight};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static EXCLAIM_OR_SUPERLATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)!{2,}|\b(guaranteed|shocking|unbelievable|exposed)\b")
        .expect("static superlative regex")
});
static ABSOLUTIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(always|never|everyone|no one)\b").expect("static absolutist regex")
});
static DENSE_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)[0-9]{2,}%|(?-u:\b)[0-9]{4,}(?-u:\b)").expect("static numeric regex")
});
static CAPS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]{5,}").expect("static caps regex"));

const NEUTRAL_REWRITE: &str = "According to available information, the described claim may require verification; evidence and context should be reviewed.";
const NEUTRAL_REWRITE_MAX_CHARS: usize = 120;

const FLAG_WEIGHT: f64 = 5.0;
const STRONG_CONFIDENCE: f64 = 0.7;
const WEAK_CONFIDENCE: f64 = 0.5;

/// Round and clamp into 0..=100. NaN maps to the 50 baseline.
pub fn clamp_score(x: f64) -> u8 {
    if x.is_nan() {
        return 50;
    }
    x.round().clamp(0.0, 100.0) as u8
}

/// Fast punctuation/lexical heuristic, 50 baseline.
pub fn initial_score(text: &str) -> u8 {
    let mut s = 50.0;
    if EXCLAIM_OR_SUPERLATIVE.is_match(text) {
        s += 15.0;
    }
    if ABSOLUTIST.is_match(text) {
        s += 10.0;
    }
    if DENSE_NUMERIC.is_match(text) {
        s += 5.0;
    }
    if CAPS_RUN.is_match(text) {
        s += 5.0;
    }
    clamp_score(s)
}

/// Distinct categories present in `highlights`.
pub fn aggregate_flags(highlights: &[Highlight]) -> BTreeSet<Category> {
    highlights.iter().map(|h| h.category).collect()
}

pub fn final_score(initial: u8, flags: usize, bias_score: u8) -> u8 {
    let bias_bump = ((f64::from(bias_score) - 50.0) / 5.0).max(0.0);
    clamp_score(f64::from(initial) + FLAG_WEIGHT * flags as f64 + bias_bump)
}

/// Boilerplate placeholder; not a paraphrase of the input.
pub fn neutral_rewrite() -> String {
    truncate_chars(NEUTRAL_REWRITE, NEUTRAL_REWRITE_MAX_CHARS).0
}

/// Run the whole heuristic pipeline over one request.
///
/// Blank text short-circuits to [`AnalysisReport::neutral`]; callers are expected to check
/// first, but the report is well-defined either way.
pub fn analyze(req: &AnalysisRequest) -> AnalysisReport {
    if !has_any_text(&req.text) {
        return AnalysisReport::neutral();
    }
    let text = req.text.as_str();

    let initial = initial_score(text);
    let highlights = find_highlights(text);
    let flags = aggregate_flags(&highlights);
    let bias = detect_bias(text);
    let sources = suggest_sources(text, &req.url, &req.title, &flags);
    let reliability = score_reliability(&sources.suggestions);
    let final_ = final_score(initial, flags.len(), bias.score);

    tracing::debug!(
        mode = %req.mode,
        chars = text.chars().count(),
        initial,
        final_score = final_,
        highlights = highlights.len(),
        flags = flags.len(),
        bias = bias.score,
        "analysis complete"
    );

    AnalysisReport {
        initial_score: initial,
        final_score: final_,
        model_confidence: if sources.strong {
            STRONG_CONFIDENCE
        } else {
            WEAK_CONFIDENCE
        },
        flags,
        highlights,
        suggested_search_queries: if sources.strong {
            Vec::new()
        } else {
            make_search_queries(text)
        },
        suggested_sources: sources.suggestions,
        bias,
        source_reliability: reliability,
        neutral_rewrite: neutral_rewrite(),
        notices: Vec::new(),
    }
}
