//! Snippet post-processing.

use docproc_core::defaults::SNIPPET_ELLIPSIS;

/// Markers `ts_headline` wraps matched words in.
const HIGHLIGHT_OPEN: &str = "<b>";
const HIGHLIGHT_CLOSE: &str = "</b>";

/// Build the snippet shown for a search hit.
///
/// Prefers the highlighted excerpt, falls back to the content prefix, bounds
/// the result to `limit` characters, and appends `...` when the full content
/// is longer than `limit` and the snippet does not already end with it.
pub fn build_snippet(
    highlight: Option<&str>,
    content_prefix: Option<&str>,
    content_chars: i64,
    limit: usize,
) -> String {
    let highlight = highlight.filter(|h| !h.trim().is_empty());
    let base = highlight.or(content_prefix).unwrap_or_default();

    let mut snippet: String = base.chars().take(limit).collect();
    if highlight.is_some() {
        close_highlight_markup(&mut snippet);
    }
    if content_chars > limit as i64 && !snippet.ends_with(SNIPPET_ELLIPSIS) {
        snippet.push_str(SNIPPET_ELLIPSIS);
    }
    snippet
}

/// Drop a highlight tag cut in half by truncation and close a dangling one.
fn close_highlight_markup(snippet: &mut String) {
    if let Some(pos) = snippet.rfind('<') {
        let tail = &snippet[pos..];
        let partial = [HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE]
            .iter()
            .any(|tag| tail.len() < tag.len() && tag.starts_with(tail));
        if partial {
            snippet.truncate(pos);
        }
    }

    let opened = snippet.matches(HIGHLIGHT_OPEN).count();
    let closed = snippet.matches(HIGHLIGHT_CLOSE).count();
    if opened > closed {
        snippet.push_str(HIGHLIGHT_CLOSE);
    }
}
