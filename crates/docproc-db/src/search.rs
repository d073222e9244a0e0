//! Search candidate queries.
//!
//! One round trip gathers candidates from all four match sources. Each branch
//! is independently ordered and limited, so the union holds at most
//! `4 * per_source_limit` rows. Merging and final ordering happen in
//! `docproc-search`.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, warn};

use docproc_core::{
    Error, MatchSource, Result, SearchCandidate, SearchConfig, SearchSource, VECTOR_RANK_CAP,
};

use crate::escape_like;

const CANDIDATE_SQL: &str = r#"
(
    SELECT d.id, d.filename, d.created_at, 'vector' AS source,
           ts_rank(d.search_vector, q.query)::float8 AS rank,
           ts_headline($1::regconfig, d.content, q.query) AS highlight,
           left(d.content, $4) AS content_prefix,
           COALESCE(char_length(d.content), 0)::int8 AS content_chars
    FROM document d, plainto_tsquery($1::regconfig, $2) AS q(query)
    WHERE d.search_vector @@ q.query
    ORDER BY LEAST(ts_rank(d.search_vector, q.query)::float8, $6::float8) DESC,
             d.created_at DESC, d.id
    LIMIT $5
)
UNION ALL
(
    SELECT d.id, d.filename, d.created_at, 'substring' AS source,
           0::float8 AS rank,
           NULL::text AS highlight,
           left(d.content, $4) AS content_prefix,
           COALESCE(char_length(d.content), 0)::int8 AS content_chars
    FROM document d
    WHERE d.search_vector IS NULL AND d.content ILIKE $3 ESCAPE '\'
    ORDER BY d.created_at DESC, d.id
    LIMIT $5
)
UNION ALL
(
    SELECT d.id, d.filename, d.created_at, 'filename' AS source,
           0::float8 AS rank,
           NULL::text AS highlight,
           left(d.content, $4) AS content_prefix,
           COALESCE(char_length(d.content), 0)::int8 AS content_chars
    FROM document d
    WHERE d.filename ILIKE $3 ESCAPE '\'
    ORDER BY d.created_at DESC, d.id
    LIMIT $5
)
UNION ALL
(
    SELECT d.id, d.filename, d.created_at, 'tag' AS source,
           0::float8 AS rank,
           NULL::text AS highlight,
           left(d.content, $4) AS content_prefix,
           COALESCE(char_length(d.content), 0)::int8 AS content_chars
    FROM document d
    WHERE EXISTS (
        SELECT 1 FROM document_tag dt
        JOIN tag t ON t.id = dt.tag_id
        WHERE dt.document_id = d.id AND t.name ILIKE $3 ESCAPE '\'
    )
    ORDER BY d.created_at DESC, d.id
    LIMIT $5
)
"#;

/// Candidate search over the document, tag, and full-text index tables.
pub struct PgSearchSource {
    pool: Pool<Postgres>,
    text_search_config: String,
    snippet_length: usize,
}

impl PgSearchSource {
    pub fn new(pool: Pool<Postgres>, config: &SearchConfig) -> Self {
        Self {
            pool,
            text_search_config: config.text_search_config.clone(),
            snippet_length: config.snippet_length,
        }
    }
}

#[async_trait]
impl SearchSource for PgSearchSource {
    async fn find_candidates(
        &self,
        query: &str,
        per_source_limit: usize,
    ) -> Result<Vec<SearchCandidate>> {
        let start = Instant::now();
        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query(CANDIDATE_SQL)
            .bind(&self.text_search_config)
            .bind(query)
            .bind(&pattern)
            .bind(self.snippet_length as i32)
            .bind(per_source_limit as i64)
            .bind(VECTOR_RANK_CAP)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let label: String = row.get("source");
            let rank: f64 = row.get("rank");
            let Some(source) = MatchSource::from_label(&label, rank) else {
                warn!(source = %label, "Unknown match source in candidate row");
                continue;
            };
            candidates.push(SearchCandidate {
                document_id: row.get("id"),
                filename: row.get("filename"),
                created_at: row.get("created_at"),
                source,
                highlight: row.get("highlight"),
                content_prefix: row.get("content_prefix"),
                content_chars: row.get("content_chars"),
            });
        }

        debug!(
            subsystem = "search",
            component = "candidates",
            op = "find",
            candidate_count = candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search candidates fetched"
        );
        Ok(candidates)
    }
}
