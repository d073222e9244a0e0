//! # docproc-extract
//!
//! Text extraction for uploaded PDFs.
//!
//! [`TextExtractionAdapter`] wraps a [`PdfBackend`] and normalizes its output
//! into page-ordered text plus a page count, translating every failure into an
//! [`ExtractionFailure`].

pub mod backends;
pub mod testing;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use docproc_core::{Error, ExtractedText, ExtractionFailure, PdfBackend};

pub use backends::{LopdfBackend, PdftotextBackend};

/// Which PDF library backs extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Lopdf,
    Pdftotext,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lopdf" => Ok(Self::Lopdf),
            "pdftotext" => Ok(Self::Pdftotext),
            other => Err(Error::Config(format!(
                "Unknown PDF backend '{}' (expected lopdf or pdftotext)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lopdf => write!(f, "lopdf"),
            Self::Pdftotext => write!(f, "pdftotext"),
        }
    }
}

/// Extracts `(full_text, page_count)` from a PDF on disk.
#[derive(Clone)]
pub struct TextExtractionAdapter {
    backend: Arc<dyn PdfBackend>,
}

impl TextExtractionAdapter {
    pub fn new(backend: Arc<dyn PdfBackend>) -> Self {
        Self { backend }
    }

    pub fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Lopdf => Self::new(Arc::new(LopdfBackend)),
            BackendKind::Pdftotext => Self::new(Arc::new(PdftotextBackend::default())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Extract page texts from the PDF at `path`.
    ///
    /// `DocumentUnreadable` if the file is missing or is not a regular file;
    /// `CorruptDocument` if the backend cannot parse it.
    pub async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionFailure> {
        let start = Instant::now();

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(ExtractionFailure::DocumentUnreadable(format!(
                    "{}: not a regular file",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(ExtractionFailure::DocumentUnreadable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        }

        let pages = match self.backend.page_texts(path).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(
                    subsystem = "extraction",
                    component = self.backend.name(),
                    op = "extract",
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Text extraction failed"
                );
                return Err(e);
            }
        };

        let text = ExtractedText { pages };
        info!(
            subsystem = "extraction",
            component = self.backend.name(),
            op = "extract",
            page_count = text.page_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Text extracted"
        );
        Ok(text)
    }
}

impl Default for TextExtractionAdapter {
    fn default() -> Self {
        Self::for_kind(BackendKind::default())
    }
}
