//! Pure-Rust PDF backend built on `lopdf`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lopdf::Document;
use tracing::{debug, warn};

use docproc_core::{ExtractionFailure, PdfBackend};

/// Parses PDFs in-process on the blocking thread pool.
///
/// A page whose text cannot be decoded contributes an empty string instead of
/// failing the whole document.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

fn page_texts_blocking(path: &Path) -> Result<Vec<String>, ExtractionFailure> {
    let bytes = std::fs::read(path).map_err(|e| {
        ExtractionFailure::DocumentUnreadable(format!("{}: {}", path.display(), e))
    })?;

    let mut document = Document::load_mem(&bytes)
        .map_err(|e| ExtractionFailure::CorruptDocument(format!("failed to load PDF: {}", e)))?;

    // Empty user password covers PDFs that are encrypted only for permissions.
    if document.is_encrypted() && document.decrypt("").is_err() {
        return Err(ExtractionFailure::CorruptDocument(
            "cannot decrypt password-protected PDF".to_string(),
        ));
    }
    document.decompress();

    // BTreeMap keys: page numbers in ascending order
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    debug!(path = %path.display(), pages = page_numbers.len(), "lopdf: document loaded");

    let texts = page_numbers
        .iter()
        .map(|&page| match document.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    subsystem = "extraction",
                    component = "lopdf",
                    page,
                    error = %e,
                    "Page text could not be decoded, using empty text"
                );
                String::new()
            }
        })
        .collect();
    Ok(texts)
}

#[async_trait]
impl PdfBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    async fn page_texts(&self, path: &Path) -> Result<Vec<String>, ExtractionFailure> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || page_texts_blocking(&path))
            .await
            .map_err(|e| {
                ExtractionFailure::CorruptDocument(format!("PDF parser task failed: {}", e))
            })?
    }
}
