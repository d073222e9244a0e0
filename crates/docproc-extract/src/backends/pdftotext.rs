//! PDF backend that shells out to `pdfinfo` and `pdftotext` (poppler-utils).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use docproc_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use docproc_core::{ExtractionFailure, PdfBackend};

/// Runs one `pdftotext` invocation per page so page boundaries are exact.
///
/// Every command is bounded by a timeout; the child is killed when the
/// timeout elapses.
#[derive(Debug, Clone)]
pub struct PdftotextBackend {
    timeout: Duration,
}

impl Default for PdftotextBackend {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(EXTRACTION_CMD_TIMEOUT_SECS))
    }
}

impl PdftotextBackend {
    /// Bound each `pdfinfo`/`pdftotext` call by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Whether the poppler binaries are installed.
    pub async fn is_available() -> bool {
        match Command::new("pdftotext").arg("-v").output().await {
            // pdftotext -v exits with 0 or 99 depending on the version
            Ok(output) => output.status.success() || output.status.code() == Some(99),
            Err(_) => false,
        }
    }

    async fn run(&self, cmd: &mut Command) -> Result<String, String> {
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| format!("command timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| format!("failed to execute command: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "command failed (exit {}): {}",
                output.status,
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Page count from `pdfinfo` output.
fn parse_page_count(output: &str) -> Option<usize> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() == "Pages" {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

#[async_trait]
impl PdfBackend for PdftotextBackend {
    fn name(&self) -> &'static str {
        "pdftotext"
    }

    async fn page_texts(&self, path: &Path) -> Result<Vec<String>, ExtractionFailure> {
        let info = self
            .run(Command::new("pdfinfo").arg(path))
            .await
            .map_err(|e| ExtractionFailure::CorruptDocument(format!("pdfinfo: {}", e)))?;
        let pages = parse_page_count(&info).ok_or_else(|| {
            ExtractionFailure::CorruptDocument("pdfinfo reported no page count".to_string())
        })?;
        debug!(path = %path.display(), pages, "pdftotext: page count");

        let mut texts = Vec::with_capacity(pages);
        for page in 1..=pages {
            let page_arg = page.to_string();
            let result = self
                .run(
                    Command::new("pdftotext")
                        .arg("-f")
                        .arg(&page_arg)
                        .arg("-l")
                        .arg(&page_arg)
                        .arg(path)
                        .arg("-"),
                )
                .await;
            match result {
                // pdftotext ends every page with a form feed
                Ok(text) => texts.push(text.trim_end_matches('\u{c}').to_string()),
                Err(e) => {
                    warn!(
                        subsystem = "extraction",
                        component = "pdftotext",
                        page,
                        error = %e,
                        "Page text could not be extracted, using empty text"
                    );
                    texts.push(String::new());
                }
            }
        }
        Ok(texts)
    }
}
