//! Minimal, deterministic text normalization helpers.

/// Lossy "scrub" used for keyword matching.
///
/// - lowercase
/// - treat non-alphanumeric as separators (collapse to single spaces)
///
/// Never used for display text.
pub fn scrub(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Collapse every whitespace run to a single space and trim.
pub fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Keep at most `max_chars` characters. Returns `(text, clipped)`.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    let mut out = String::new();
    for (n, ch) in s.chars().enumerate() {
        if n >= max_chars {
            return (out, true);
        }
        out.push(ch);
    }
    (out, false)
}

/// Character index of byte offset `b` in `s` (clamped to the string length).
pub fn byte_to_char_index(s: &str, b: usize) -> usize {
    let b = b.min(s.len());
    s.char_indices().take_while(|(i, _)| *i < b).count()
}
