//! HTTP error mapping.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use docproc_core::{Error, UploadRejection};

/// Error returned by every handler, rendered as `{"error", "code"}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(Error),
    NotFound(String),
    BadRequest { code: &'static str, message: String },
    PayloadTooLarge(String),
    Conflict(String),
    /// The document row exists with a `failed` status.
    ProcessingFailed {
        document_id: Uuid,
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ProcessingFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::InvalidInput(msg) => ApiError::bad_request("invalid_input", msg),
            Error::Rejected(rejection @ UploadRejection::FileTooLarge { .. }) => {
                ApiError::PayloadTooLarge(rejection.to_string())
            }
            Error::Rejected(rejection) => ApiError::bad_request(rejection.code(), rejection.to_string()),
            Error::ProcessingFailed {
                document_id,
                source,
            } => ApiError::ProcessingFailed {
                document_id,
                code: source.code(),
                message: format!("Processing failed: {}", source),
            },
            Error::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                ApiError::Conflict("Resource already exists".to_string())
            }
            other => ApiError::Internal(other),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::bad_request("invalid_multipart", format!("Failed to read upload: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Internal(err) => {
                error!(
                    subsystem = "api",
                    code = err.code(),
                    error = %err,
                    "Request failed"
                );
                json!({ "error": "Internal server error", "code": err.code() })
            }
            ApiError::NotFound(msg) => json!({ "error": msg, "code": "not_found" }),
            ApiError::BadRequest { code, message } => json!({ "error": message, "code": code }),
            ApiError::PayloadTooLarge(msg) => json!({ "error": msg, "code": "file_too_large" }),
            ApiError::Conflict(msg) => json!({ "error": msg, "code": "conflict" }),
            ApiError::ProcessingFailed {
                document_id,
                code,
                message,
            } => json!({
                "error": message,
                "code": code,
                "id": document_id,
                "status": "failed",
            }),
        };
        (status, Json(body)).into_response()
    }
}
