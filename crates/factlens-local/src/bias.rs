//! Lexical left/right framing meter.
//!
//! The cue tables are small on purpose: this is a framing hint, not a classifier.

use factlens_core::BiasResult;
use once_cell::sync::Lazy;
use regex::Regex;

static LEFT_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(progressives?|social justice|systemic racism|climate crisis|gun control|undocumented immigrants?|income inequality|corporate greed|reproductive rights|marginalized communities|far-right extremists?|billionaire class)\b",
    )
    .expect("static left cue regex")
});

static RIGHT_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(illegal aliens?|radical left|woke|patriots?|border crisis|tax burden|big government|law and order|traditional values|deep state|globalists?|leftist agenda)\b",
    )
    .expect("static right cue regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueCounts {
    pub left: usize,
    pub right: usize,
    pub words: usize,
}

pub fn count_cues(text: &str) -> CueCounts {
    CueCounts {
        left: LEFT_CUES.find_iter(text).count(),
        right: RIGHT_CUES.find_iter(text).count(),
        words: text.split_whitespace().count(),
    }
}

/// 0 = left, 100 = right. Monotonic in each cue count.
pub fn axis_score(c: CueCounts) -> u8 {
    let l = c.left as f64;
    let r = c.right as f64;
    let s = 50.0 + 50.0 * (r - l) / (r + l + 2.0);
    s.round().clamp(0.0, 100.0) as u8
}

pub fn label_for(score: u8) -> &'static str {
    match score {
        0..=20 => "Left",
        21..=39 => "Lean Left",
        40..=60 => "Center",
        61..=79 => "Lean Right",
        _ => "Right",
    }
}

pub fn confidence_for(c: CueCounts) -> f64 {
    let cues = c.left + c.right;
    if cues == 0 {
        return 0.5;
    }
    // Saturates at one cue per 25 words.
    let density = cues as f64 / c.words.max(1) as f64;
    (0.5 + 0.5 * (density * 25.0).min(1.0)).clamp(0.0, 1.0)
}

pub fn detect_bias(text: &str) -> BiasResult {
    let c = count_cues(text);
    let score = axis_score(c);
    BiasResult {
        label: label_for(score).to_string(),
        score,
        confidence: confidence_for(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_cues_is_center_with_mid_confidence() {
        let b = detect_bias("The council met on Tuesday to discuss the budget.");
        assert_eq!(b.score, 50);
        assert_eq!(b.label, "Center");
        assert_eq!(b.confidence, 0.5);
    }

    #[test]
    fn right_cues_push_right() {
        let b = detect_bias("Patriots say the deep state and the radical left caused the border crisis.");
        assert!(b.score > 60, "score={}", b.score);
        assert!(b.confidence > 0.5);
    }

    #[test]
    fn left_cues_push_left() {
        let b = detect_bias("Progressives blame corporate greed and income inequality.");
        assert!(b.score < 40, "score={}", b.score);
        assert!(b.label.contains("Left"));
    }

    proptest! {
        #[test]
        fn adding_right_cues_never_lowers_score(l in 0usize..50, r in 0usize..50, words in 1usize..500) {
            let a = axis_score(CueCounts { left: l, right: r, words });
            let b = axis_score(CueCounts { left: l, right: r + 1, words });
            prop_assert!(b >= a);
        }

        #[test]
        fn adding_left_cues_never_raises_score(l in 0usize..50, r in 0usize..50, words in 1usize..500) {
            let a = axis_score(CueCounts { left: l, right: r, words });
            let b = axis_score(CueCounts { left: l + 1, right: r, words });
            prop_assert!(b <= a);
        }

        #[test]
        fn confidence_is_bounded(text in ".{0,300}") {
            let b = detect_bias(&text);
            prop_assert!((0.0..=1.0).contains(&b.confidence));
            prop_assert!(b.score <= 100);
        }
    }
}
