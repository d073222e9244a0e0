//! docproc-api - HTTP API server for docproc
//!
//! The router is built from an [`AppState`] holding trait objects, so the
//! binary wires in the PostgreSQL repositories and tests wire in
//! [`docproc_db::MemoryStore`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use docproc_core::{defaults, DocumentRepository, TagRepository};
use docproc_search::SearchEngine;

pub use config::AppConfig;
pub use error::ApiError;
pub use services::IngestService;

use handlers::{documents, health, search, tags};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub search: SearchEngine,
    pub ingest: IngestService,
}

/// Parse configured CORS origins, skipping (and logging) invalid entries.
pub fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        return vec![HeaderValue::from_static(defaults::CORS_ORIGIN)];
    }
    parsed
}

/// Build the HTTP router with CORS, tracing, and the request body ceiling.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let body_limit = usize::try_from(state.ingest.config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(defaults::MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/documents",
            post(documents::upload_document).get(documents::list_documents),
        )
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/documents/:id/tags", get(tags::list_document_tags))
        .route(
            "/documents/:id/tags/:tag_id",
            post(tags::add_tag_to_document).delete(tags::remove_tag_from_document),
        )
        .route("/search", get(search::search_documents))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/:id", get(tags::get_tag).delete(tags::delete_tag))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins(allowed_origins)))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true)
                .max_age(Duration::from_secs(defaults::CORS_MAX_AGE_SECS)),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
