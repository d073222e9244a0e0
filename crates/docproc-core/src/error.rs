//! Error types for docproc.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using docproc's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an upload is refused before any byte reaches disk.
///
/// Each variant carries one precise, user-facing reason; callers can resubmit
/// corrected input. No partial writes exist when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    /// Filename is empty or sanitizes to nothing usable.
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// Constructed storage path resolves outside the storage root.
    #[error("Invalid file path")]
    PathTraversalRejected,

    /// No filename was supplied with the upload.
    #[error("Filename is required")]
    MissingFilename,

    /// Extension is not in the allowed set.
    #[error("File extension '{0}' is not allowed; only .pdf files are accepted")]
    UnsupportedExtension(String),

    /// Declared content type is not `application/pdf`.
    #[error("Content type '{0}' is not allowed; expected application/pdf")]
    UnsupportedContentType(String),

    /// Payload exceeds the configured ceiling.
    #[error("File exceeds maximum size of {max} bytes (got {actual} bytes)")]
    FileTooLarge { max: u64, actual: u64 },

    /// Payload is zero bytes long.
    #[error("File is empty")]
    EmptyFile,

    /// Payload does not start with the `%PDF` signature.
    #[error("File content is not a PDF{}", detected_suffix(.detected))]
    InvalidSignature { detected: Option<String> },
}

fn detected_suffix(detected: &Option<String>) -> String {
    match detected {
        Some(mime) => format!(" (detected {})", mime),
        None => String::new(),
    }
}

impl UploadRejection {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFilename(_) => "invalid_filename",
            Self::PathTraversalRejected => "path_traversal_rejected",
            Self::MissingFilename => "missing_filename",
            Self::UnsupportedExtension(_) => "unsupported_extension",
            Self::UnsupportedContentType(_) => "unsupported_content_type",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::EmptyFile => "empty_file",
            Self::InvalidSignature { .. } => "invalid_signature",
        }
    }
}

/// Failures raised while extracting text from a file already on disk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// Signature passed but the internal structure could not be parsed.
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// The file vanished or could not be opened at extraction time.
    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),
}

impl ExtractionFailure {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CorruptDocument(_) => "corrupt_document",
            Self::DocumentUnreadable(_) => "document_unreadable",
        }
    }
}

/// Core error type for docproc operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists or association already present
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload refused by the gate checks
    #[error(transparent)]
    Rejected(#[from] UploadRejection),

    /// Document row exists but text extraction failed
    #[error("Processing failed for document {document_id}: {source}")]
    ProcessingFailed {
        document_id: Uuid,
        #[source]
        source: ExtractionFailure,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "config_error",
            Self::Rejected(r) => r.code(),
            Self::ProcessingFailed { source, .. } => source.code(),
            Self::Internal(_) => "internal_error",
            Self::Io(_) => "io_error",
        }
    }
}
