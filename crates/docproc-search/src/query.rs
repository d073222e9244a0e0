//! Query sanitization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Anything that is not a letter, combining mark, digit, or whitespace.
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{M}\p{N}\s]").expect("static regex"));

/// Reduce a raw query to words separated by single spaces.
///
/// Punctuation and symbols become spaces, runs of whitespace collapse, and
/// the result is trimmed. An empty result means there is nothing to search.
pub fn sanitize_query(raw: &str) -> String {
    let spaced = NON_WORD.replace_all(raw, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
