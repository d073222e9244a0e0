//! Tag HTTP handlers.
//!
//! Tag CRUD plus the document-tag association endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use docproc_core::{CreateTagRequest, Tag, TagList};

use crate::{ApiError, AppState};

/// List all tags ordered by name.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagList>, ApiError> {
    Ok(Json(TagList::from(state.tags.list().await?)))
}

/// Create a tag.
///
/// # Returns
/// - 201 Created with the tag
/// - 400 Bad Request for a blank or over-long name
/// - 409 Conflict if a tag with the same name exists (case-insensitive)
pub async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.tags.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tags.get(id).await?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.tags.delete(id).await?;
    Ok(Json(json!({ "message": "Tag deleted" })))
}

pub async fn add_tag_to_document(
    State(state): State<AppState>,
    Path((document_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.tags.add_to_document(document_id, tag_id).await?;
    Ok(Json(json!({ "message": "Tag added to document" })))
}

pub async fn remove_tag_from_document(
    State(state): State<AppState>,
    Path((document_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.tags.remove_from_document(document_id, tag_id).await?;
    Ok(Json(json!({ "message": "Tag removed from document" })))
}

pub async fn list_document_tags(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<TagList>, ApiError> {
    let tags = state.tags.list_for_document(document_id).await?;
    Ok(Json(TagList::from(tags)))
}
