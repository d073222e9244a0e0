//! Collaborator traits.
//!
//! Storage, search, and PDF parsing sit behind these interfaces so the
//! pipeline can run against PostgreSQL in production and an in-memory store in
//! tests.

use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ExtractionFailure, Result};
use crate::models::*;
use crate::search::SearchCandidate;

// =============================================================================
// DOCUMENT REPOSITORY
// =============================================================================

/// Persistence for documents and their processing status.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a document and its processing status atomically.
    async fn insert(&self, doc: NewDocument) -> Result<Document>;

    /// Fetch the full view of a document. `NotFound` if absent.
    async fn fetch(&self, id: Uuid) -> Result<DocumentDetail>;

    /// List documents, newest first.
    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse>;

    /// Delete the record and return it so the caller can remove the file.
    /// `NotFound` if absent.
    async fn delete(&self, id: Uuid) -> Result<Document>;

    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Compute the search index for documents that lack one.
    /// Returns the number of rows updated.
    async fn backfill_search_index(&self) -> Result<u64>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Tags and document-tag associations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag. `Conflict` if the name exists case-insensitively.
    async fn create(&self, name: &str) -> Result<Tag>;

    /// All tags ordered by name.
    async fn list(&self) -> Result<Vec<Tag>>;

    async fn get(&self, id: Uuid) -> Result<Tag>;

    /// Delete a tag and its associations. `NotFound` if absent.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// `NotFound` for a missing document or tag, `Conflict` if already
    /// associated.
    async fn add_to_document(&self, document_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// `NotFound` for a missing document, tag, or association.
    async fn remove_from_document(&self, document_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Tags on a document ordered by name. `NotFound` if the document is absent.
    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Tag>>;
}

// =============================================================================
// SEARCH
// =============================================================================

/// Produces raw match candidates for a sanitized, non-empty query.
///
/// Each source contributes at most `per_source_limit` candidates, taken in
/// order of its own score and then recency.
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn find_candidates(
        &self,
        query: &str,
        per_source_limit: usize,
    ) -> Result<Vec<SearchCandidate>>;
}

// =============================================================================
// PDF BACKEND
// =============================================================================

/// A PDF parsing library.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Page texts in page order.
    async fn page_texts(&self, path: &Path) -> std::result::Result<Vec<String>, ExtractionFailure>;
}
