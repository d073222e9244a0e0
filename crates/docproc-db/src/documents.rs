//! Document repository implementation.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Acquire, PgConnection, Pool, Postgres, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use docproc_core::{
    Document, DocumentDetail, DocumentRepository, DocumentSummary, Error, ListDocumentsRequest,
    ListDocumentsResponse, NewDocument, ProcessingState, Result,
};

use crate::tags::tags_for_documents;

/// PostgreSQL implementation of DocumentRepository.
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
    text_search_config: String,
}

impl PgDocumentRepository {
    /// Create a repository that indexes content with the given text search
    /// configuration (e.g. `portuguese`).
    pub fn new(pool: Pool<Postgres>, text_search_config: impl Into<String>) -> Self {
        Self {
            pool,
            text_search_config: text_search_config.into(),
        }
    }
}

/// SQLSTATE `program_limit_exceeded`, raised when a tsvector passes 1 MiB.
const TSVECTOR_TOO_LONG: &str = "54000";

const INDEX_DOCUMENT_SQL: &str = "UPDATE document SET search_vector = to_tsvector($2::regconfig, content)
     WHERE id = $1 AND content IS NOT NULL";

fn is_index_overflow(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(TSVECTOR_TOO_LONG),
        _ => false,
    }
}

/// Build the search vector inside a savepoint. Content too large for a
/// tsvector leaves the column NULL, so only the substring fallback sees it.
async fn index_document(
    conn: &mut PgConnection,
    id: Uuid,
    text_search_config: &str,
) -> Result<bool> {
    let mut savepoint = conn.begin().await?;
    match sqlx::query(INDEX_DOCUMENT_SQL)
        .bind(id)
        .bind(text_search_config)
        .execute(&mut *savepoint)
        .await
    {
        Ok(result) => {
            savepoint.commit().await?;
            Ok(result.rows_affected() > 0)
        }
        Err(e) if is_index_overflow(&e) => {
            savepoint.rollback().await?;
            warn!(
                subsystem = "database",
                component = "documents",
                op = "index",
                document_id = %id,
                error = %e,
                "Content too large for full-text index, leaving it unindexed"
            );
            Ok(false)
        }
        Err(e) => Err(Error::Database(e)),
    }
}

fn document_from_row(row: &PgRow) -> Document {
    Document {
        id: row.get("id"),
        filename: row.get("filename"),
        storage_path: row.get("storage_path"),
        content: row.get("content"),
        file_size: row.get("file_size"),
        page_count: row.get("page_count"),
        created_at: row.get("created_at"),
    }
}

fn status_label(row: &PgRow) -> String {
    let state = row
        .get::<Option<String>, _>("status")
        .and_then(|s| s.parse::<ProcessingState>().ok());
    ProcessingState::label(state)
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert(&self, doc: NewDocument) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(
            r#"
            INSERT INTO document (id, filename, storage_path, content, file_size, page_count,
                                  created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, filename, storage_path, content, file_size, page_count, created_at
            "#,
        )
        .bind(doc.id)
        .bind(&doc.filename)
        .bind(&doc.storage_path)
        .bind(&doc.content)
        .bind(doc.file_size)
        .bind(doc.page_count)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let indexed = if doc.content.is_some() {
            index_document(&mut tx, doc.id, &self.text_search_config).await?
        } else {
            false
        };

        sqlx::query(
            "INSERT INTO processing_status (document_id, status, error_message, completed_at)
             VALUES ($1, $2, $3, NOW())",
        )
        .bind(doc.id)
        .bind(doc.state.to_string())
        .bind(&doc.error_message)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "insert",
            document_id = %doc.id,
            status = %doc.state,
            indexed,
            "Document inserted"
        );
        Ok(document_from_row(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<DocumentDetail> {
        let row = sqlx::query(
            r#"
            SELECT d.id, d.filename, d.content, d.file_size, d.page_count, d.created_at,
                   d.search_vector IS NOT NULL AS indexed,
                   ps.status, ps.error_message
            FROM document d
            LEFT JOIN processing_status ps ON ps.document_id = d.id
            WHERE d.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;

        let tags = tags_for_documents(&self.pool, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(DocumentDetail {
            id: row.get("id"),
            filename: row.get("filename"),
            content: row.get("content"),
            file_size: row.get("file_size"),
            page_count: row.get("page_count"),
            status: status_label(&row),
            error_message: row.get("error_message"),
            indexed: row.get("indexed"),
            created_at: row.get("created_at"),
            tags,
        })
    }

    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let rows = sqlx::query(
            r#"
            SELECT d.id, d.filename, d.file_size, d.page_count, d.created_at, ps.status
            FROM document d
            LEFT JOIN processing_status ps ON ps.document_id = d.id
            ORDER BY d.created_at DESC, d.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(req.page_size)
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
        let mut tags = tags_for_documents(&self.pool, &ids).await?;

        let items = rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                DocumentSummary {
                    id,
                    filename: row.get("filename"),
                    file_size: row.get("file_size"),
                    page_count: row.get("page_count"),
                    status: status_label(row),
                    created_at: row.get("created_at"),
                    tags: tags.remove(&id).unwrap_or_default(),
                }
            })
            .collect();

        Ok(ListDocumentsResponse::new(items, total, req))
    }

    async fn delete(&self, id: Uuid) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // processing_status and document_tag rows cascade
        let row = sqlx::query(
            "DELETE FROM document WHERE id = $1
             RETURNING id, filename, storage_path, content, file_size, page_count, created_at",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(document_from_row(&row))
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn backfill_search_index(&self) -> Result<u64> {
        let start = Instant::now();
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM document
             WHERE search_vector IS NULL AND content IS NOT NULL
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut updated = 0u64;
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        for id in &ids {
            if index_document(&mut conn, *id, &self.text_search_config).await? {
                updated += 1;
            }
        }

        info!(
            subsystem = "database",
            component = "documents",
            op = "backfill_search_index",
            updated,
            skipped = ids.len() as u64 - updated,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search index backfill complete"
        );
        Ok(updated)
    }
}
