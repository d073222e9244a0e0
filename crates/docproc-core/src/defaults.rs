//! Centralized default constants for docproc.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// UPLOAD
// =============================================================================

/// Maximum accepted upload size in bytes (50 MiB).
///
/// Configurable via `MAX_UPLOAD_SIZE_BYTES`.
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted by the upload validator (lowercase, without dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// The only content type accepted by the upload validator.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Leading bytes every accepted payload must carry.
pub const PDF_SIGNATURE: &[u8; 4] = b"%PDF";

/// Hex characters in the random filename prefix.
pub const FILENAME_PREFIX_LEN: usize = 8;

/// Default storage root for uploaded files.
pub const UPLOAD_DIR: &str = "/tmp/docproc_uploads";

// =============================================================================
// EXTRACTION
// =============================================================================

/// Timeout for a single external extraction command (pdfinfo, pdftotext).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// SEARCH
// =============================================================================

/// Maximum number of results returned by one search.
pub const SEARCH_RESULT_LIMIT: usize = 100;

/// Snippet length in characters.
pub const SNIPPET_LENGTH: usize = 200;

/// Suffix marking a truncated snippet.
pub const SNIPPET_ELLIPSIS: &str = "...";

/// Default PostgreSQL text search configuration.
pub const TEXT_SEARCH_CONFIG: &str = "portuguese";

// =============================================================================
// TAGS
// =============================================================================

/// Maximum tag name length in characters.
pub const TAG_NAME_MAX_LEN: usize = 100;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for document listing.
pub const PAGE_SIZE: i64 = 50;

/// Largest page size a client may request.
pub const PAGE_SIZE_MAX: i64 = 500;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8000;

/// Default CORS origin.
pub const CORS_ORIGIN: &str = "http://localhost:3000";

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Extra request body allowance on top of the upload ceiling for multipart
/// framing and headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
