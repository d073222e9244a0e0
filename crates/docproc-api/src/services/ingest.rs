//! Upload and deletion pipeline.
//!
//! An upload runs the gate checks (validator, sanitizer, path guard) before
//! any byte is written, stages the file, extracts its text, and records the
//! document together with its processing status.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use docproc_core::{
    new_v7, sanitize_filename, validate_upload, DocumentRepository, Error, IngestConfig,
    NewDocument, ProcessingState, Result, UploadReceipt, UploadRejection,
};
use docproc_db::FileStore;
use docproc_extract::TextExtractionAdapter;

/// Coordinates file storage, extraction, and the document repository.
#[derive(Clone)]
pub struct IngestService {
    documents: Arc<dyn DocumentRepository>,
    store: FileStore,
    extractor: TextExtractionAdapter,
    config: IngestConfig,
}

impl IngestService {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        store: FileStore,
        extractor: TextExtractionAdapter,
        config: IngestConfig,
    ) -> Self {
        Self {
            documents,
            store,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Accept an uploaded PDF.
    ///
    /// Gate failures return `Error::Rejected` with nothing written. When
    /// extraction fails the staged file is discarded, the document is still
    /// recorded as `failed`, and `Error::ProcessingFailed` carries its id.
    pub async fn upload(
        &self,
        filename: Option<&str>,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<UploadReceipt> {
        let start = Instant::now();

        validate_upload(filename, content_type, data, self.config.max_upload_bytes)?;
        let original = filename.ok_or(UploadRejection::MissingFilename)?;
        let safe_name = sanitize_filename(original)?;
        let staged = self.store.stage(&safe_name, data).await?;

        let id = new_v7();
        let file_size = data.len() as i64;

        let extracted = match self.extractor.extract(staged.path()).await {
            Ok(text) => text,
            Err(failure) => {
                drop(staged);
                self.documents
                    .insert(NewDocument {
                        id,
                        filename: original.to_string(),
                        storage_path: None,
                        content: None,
                        file_size,
                        page_count: None,
                        state: ProcessingState::Failed,
                        error_message: Some(failure.to_string()),
                    })
                    .await?;
                warn!(
                    subsystem = "ingest",
                    op = "upload",
                    document_id = %id,
                    code = failure.code(),
                    error = %failure,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Document stored with failed status"
                );
                return Err(Error::ProcessingFailed {
                    document_id: id,
                    source: failure,
                });
            }
        };

        let page_count = i32::try_from(extracted.page_count())
            .map_err(|_| Error::Internal("page count out of range".to_string()))?;
        self.documents
            .insert(NewDocument {
                id,
                filename: original.to_string(),
                storage_path: Some(staged.storage_path()),
                content: Some(extracted.full_text()),
                file_size,
                page_count: Some(page_count),
                state: ProcessingState::Completed,
                error_message: None,
            })
            .await?;
        staged.commit();

        info!(
            subsystem = "ingest",
            op = "upload",
            document_id = %id,
            file_size,
            page_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document ingested"
        );
        Ok(UploadReceipt {
            id,
            filename: original.to_string(),
        })
    }

    /// Delete the record, then best-effort the stored file.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let doc = self.documents.delete(id).await?;
        if let Some(path) = doc.storage_path.as_deref() {
            self.store.remove(path).await;
        }
        info!(
            subsystem = "ingest",
            op = "delete",
            document_id = %id,
            "Document deleted"
        );
        Ok(())
    }
}
