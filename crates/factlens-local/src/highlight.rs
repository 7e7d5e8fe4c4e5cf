//! Pattern rules that turn suspicious phrases into highlights.

use crate::textprep::byte_to_char_index;
use factlens_core::{Category, Highlight};
use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on highlights per analysis; extra matches are dropped.
pub const MAX_HIGHLIGHTS: usize = 20;

pub struct Rule {
    pub category: Category,
    pub re: Regex,
}

fn rule(category: Category, pattern: &str) -> Rule {
    Rule {
        category,
        re: Regex::new(pattern).expect("static highlight rule"),
    }
}

/// Declaration order is output order.
pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            Category::Exaggeration,
            r"(?i)\b(doubles your lifespan|cure-all|miracle|100% safe|guaranteed)\b",
        ),
        rule(
            Category::Sensationalism,
            r"(?i)\b(shocking|explosive|exposed|cover-?up|you won't believe)\b",
        ),
        rule(
            Category::BiasedLanguage,
            r"(?i)\b(corrupt elites|mainstream media lies|traitors|sheeple)\b",
        ),
        // ASCII digits only. No trailing boundary: "%" is not a word char.
        rule(Category::UncitedStatistic, r"(?-u:\b)[0-9]{1,3}%"),
        rule(
            Category::SourceAmbiguity,
            r"(?i)\b(experts say|sources claim|it is said)\b",
        ),
        rule(
            Category::MisleadingContext,
            r"(?i)\b(out of context|taken out of context)\b",
        ),
    ]
});

/// Prose shown after the reason in a marker tooltip.
pub const EXPLANATION: &str = "Needs citation or nuance.";

/// Scan `text` with every rule, in rule order then match order.
pub fn find_highlights(text: &str) -> Vec<Highlight> {
    let mut out = Vec::new();
    for r in RULES.iter() {
        for m in r.re.find_iter(text) {
            if out.len() >= MAX_HIGHLIGHTS {
                tracing::debug!(cap = MAX_HIGHLIGHTS, "highlight cap reached; truncating");
                return out;
            }
            if m.as_str().is_empty() {
                continue;
            }
            out.push(Highlight {
                span: m.as_str().to_string(),
                start: byte_to_char_index(text, m.start()),
                end: byte_to_char_index(text, m.end()),
                category: r.category,
                reason: r.category.default_reason().to_string(),
                explanation: EXPLANATION.to_string(),
            });
        }
    }
    out
}
