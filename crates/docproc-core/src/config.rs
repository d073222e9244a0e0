//! Explicit configuration structs passed to components at construction.

use std::path::PathBuf;

use crate::defaults;

/// Settings for the upload pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Storage root for uploaded files.
    pub upload_dir: PathBuf,
    /// Upload ceiling in bytes (inclusive).
    pub max_upload_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(defaults::UPLOAD_DIR),
            max_upload_bytes: defaults::MAX_UPLOAD_SIZE_BYTES,
        }
    }
}

/// Settings for the search engine and its backends.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of results returned.
    pub result_limit: usize,
    /// Maximum candidates each match source may contribute.
    pub per_source_limit: usize,
    /// Snippet bound in characters.
    pub snippet_length: usize,
    /// PostgreSQL text search configuration (e.g. `portuguese`).
    pub text_search_config: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: defaults::SEARCH_RESULT_LIMIT,
            per_source_limit: defaults::SEARCH_RESULT_LIMIT,
            snippet_length: defaults::SNIPPET_LENGTH,
            text_search_config: defaults::TEXT_SEARCH_CONFIG.to_string(),
        }
    }
}
