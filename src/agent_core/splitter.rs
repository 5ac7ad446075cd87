//! Multi-instruction splitting.
//!
//! Heuristic segmentation: sentence-ending punctuation followed by
//! whitespace, the standalone word "and", semicolons and newlines all end an
//! instruction. Decimals, abbreviations and email addresses get no special
//! treatment, so over- and under-splitting are both possible.

use std::sync::LazyLock;

use regex::Regex;

/// Group 1 captures the sentence punctuation, which stays with the fragment
/// it ends.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s+|\band\b|;|\n").expect("static regex"));

/// Split a request into trimmed, non-empty instructions in input order.
pub fn split_instructions(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut start = 0;

    for caps in SEPARATOR.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let end = caps.get(1).map_or(whole.start(), |punct| punct.end());
        fragments.push(&text[start..end]);
        start = whole.end();
    }
    fragments.push(&text[start..]);

    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
