//! Tag repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use docproc_core::{new_v7, normalize_tag_name, Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn ensure_document(&self, document_id: Uuid) -> Result<()> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        if found {
            Ok(())
        } else {
            Err(Error::NotFound("Document not found".to_string()))
        }
    }
}

/// Tags for each of the given documents, ordered by name.
pub(crate) async fn tags_for_documents(
    pool: &Pool<Postgres>,
    document_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Tag>>> {
    if document_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT dt.document_id, t.id, t.name, t.created_at
        FROM document_tag dt
        JOIN tag t ON t.id = dt.tag_id
        WHERE dt.document_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(document_ids)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)?;

    let mut by_document: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for row in rows {
        by_document
            .entry(row.get("document_id"))
            .or_default()
            .push(Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            });
    }
    Ok(by_document)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, name: &str) -> Result<Tag> {
        let name = normalize_tag_name(name)?;

        let row = sqlx::query(
            "INSERT INTO tag (id, name, created_at) VALUES ($1, $2, NOW())
             RETURNING id, name, created_at",
        )
        .bind(new_v7())
        .bind(&name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("Tag '{}' already exists", name))
            } else {
                Error::Database(e)
            }
        })?;

        Ok(Tag {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM tag ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Tag> {
        let row = sqlx::query("SELECT id, name, created_at FROM tag WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound("Tag not found".to_string()))?;

        Ok(Tag {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // document_tag rows cascade; documents are untouched
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Tag not found".to_string()));
        }
        Ok(())
    }

    async fn add_to_document(&self, document_id: Uuid, tag_id: Uuid) -> Result<()> {
        self.ensure_document(document_id).await?;
        self.get(tag_id).await?;

        let result = sqlx::query(
            "INSERT INTO document_tag (document_id, tag_id, created_at) VALUES ($1, $2, NOW())
             ON CONFLICT (document_id, tag_id) DO NOTHING",
        )
        .bind(document_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(
                "Tag already added to document".to_string(),
            ));
        }
        Ok(())
    }

    async fn remove_from_document(&self, document_id: Uuid, tag_id: Uuid) -> Result<()> {
        self.ensure_document(document_id).await?;
        self.get(tag_id).await?;

        let result = sqlx::query("DELETE FROM document_tag WHERE document_id = $1 AND tag_id = $2")
            .bind(document_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Tag not found on document".to_string()));
        }
        Ok(())
    }

    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Tag>> {
        self.ensure_document(document_id).await?;
        Ok(tags_for_documents(&self.pool, &[document_id])
            .await?
            .remove(&document_id)
            .unwrap_or_default())
    }
}
