//! Document HTTP handlers.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use docproc_core::{DocumentDetail, ListDocumentsRequest, ListDocumentsResponse, UploadReceipt};

use crate::{ApiError, AppState};

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Upload a PDF.
///
/// # Returns
/// - 201 Created with `{id, filename}`
/// - 400 Bad Request when the upload is rejected
/// - 413 Payload Too Large above the size ceiling
/// - 422 Unprocessable Entity when text extraction fails
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadReceipt>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let receipt = state
            .ingest
            .upload(filename.as_deref(), content_type.as_deref(), &data)
            .await?;
        return Ok((StatusCode::CREATED, Json(receipt)));
    }

    Err(ApiError::bad_request(
        "missing_file",
        "No file uploaded. Use field name 'file'.",
    ))
}

/// List documents, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<ListDocumentsResponse>, ApiError> {
    let req = ListDocumentsRequest::new(query.page, query.page_size);
    Ok(Json(state.documents.list(req).await?))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentDetail>, ApiError> {
    Ok(Json(state.documents.fetch(id).await?))
}

/// Delete a document and its stored file.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.ingest.delete(id).await?;
    Ok(Json(json!({ "message": "Document deleted" })))
}
