//! Search HTTP handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use docproc_core::SearchResult;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search documents by content, filename, and tag.
///
/// A missing or punctuation-only `q` yields an empty list.
pub async fn search_documents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    Ok(Json(state.search.search(&query.q).await?))
}
