//! Search engine entry point.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use docproc_core::{Result, SearchConfig, SearchResult, SearchSource};

use crate::query::sanitize_query;
use crate::ranking::rank_candidates;
use crate::snippet::build_snippet;

/// Ranked, deduplicated search over a [`SearchSource`].
#[derive(Clone)]
pub struct SearchEngine {
    source: Arc<dyn SearchSource>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(source: Arc<dyn SearchSource>, config: SearchConfig) -> Self {
        Self { source, config }
    }

    /// Run a raw user query.
    ///
    /// A query that sanitizes to nothing returns an empty list.
    pub async fn search(&self, raw_query: &str) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let query = sanitize_query(raw_query);
        if query.is_empty() {
            debug!(
                subsystem = "search",
                op = "search",
                raw_len = raw_query.len(),
                "Query empty after sanitization"
            );
            return Ok(Vec::new());
        }

        let candidates = self
            .source
            .find_candidates(&query, self.config.per_source_limit)
            .await?;
        let candidate_count = candidates.len();

        let results: Vec<SearchResult> = rank_candidates(candidates, self.config.result_limit)
            .into_iter()
            .map(|doc| SearchResult {
                snippet: build_snippet(
                    doc.highlight.as_deref(),
                    doc.content_prefix.as_deref(),
                    doc.content_chars,
                    self.config.snippet_length,
                ),
                id: doc.id,
                filename: doc.filename,
                score: doc.score,
            })
            .collect();

        info!(
            subsystem = "search",
            op = "search",
            query = %query,
            candidate_count,
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(results)
    }
}
