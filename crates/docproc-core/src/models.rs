//! Core data models for docproc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{PAGE_SIZE, PAGE_SIZE_MAX};

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A stored document.
///
/// `filename` is the client-supplied name and is only ever displayed.
/// `storage_path` is the sanitized on-disk location; `None` once processing
/// failed and the staged file was discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub storage_path: Option<String>,
    pub content: Option<String>,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of processing an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Completed,
    Failed,
}

impl ProcessingState {
    /// Label shown to clients, `"unknown"` when no status row exists.
    pub fn label(state: Option<ProcessingState>) -> String {
        state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ProcessingState {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid processing state: {}", s)),
        }
    }
}

/// Request for inserting a document together with its processing status.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Uuid,
    pub filename: String,
    pub storage_path: Option<String>,
    pub content: Option<String>,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub state: ProcessingState,
    pub error_message: Option<String>,
}

/// Row in a document listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

/// Full document view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub id: Uuid,
    pub filename: String,
    pub content: Option<String>,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Whether a pre-computed search index exists for the content.
    pub indexed: bool,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

/// Pagination parameters for listing documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListDocumentsRequest {
    /// 1-based page number.
    pub page: i64,
    pub page_size: i64,
}

impl Default for ListDocumentsRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

impl ListDocumentsRequest {
    /// Build a request, clamping out-of-range values.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(PAGE_SIZE).clamp(1, PAGE_SIZE_MAX),
        }
    }

    /// Rows to skip; saturates for page numbers past any real listing.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Paginated document listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    pub items: Vec<DocumentSummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl ListDocumentsResponse {
    pub fn new(items: Vec<DocumentSummary>, total: i64, req: ListDocumentsRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + req.page_size - 1) / req.page_size
        };
        Self {
            items,
            total,
            page: req.page,
            page_size: req.page_size,
            total_pages,
        }
    }
}

/// Returned to the client after a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub filename: String,
}

/// Text pulled out of a PDF, one entry per page in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

impl ExtractedText {
    /// Page texts concatenated with no separator. NUL characters are
    /// dropped since PostgreSQL text columns cannot hold them.
    pub fn full_text(&self) -> String {
        let mut text = self.pages.concat();
        text.retain(|c| c != '\0');
        text
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// =============================================================================
// TAGS
// =============================================================================

/// A user-defined label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

/// Tag listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagList {
    pub items: Vec<Tag>,
    pub total: usize,
}

impl From<Vec<Tag>> for TagList {
    fn from(items: Vec<Tag>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// One ranked search hit.
///
/// The score only orders results and is not part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub filename: String,
    pub snippet: String,
    #[serde(skip)]
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_state_round_trip() {
        for state in [ProcessingState::Completed, ProcessingState::Failed] {
            let parsed: ProcessingState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("pending".parse::<ProcessingState>().is_err());
    }

    #[test]
    fn test_processing_state_label_unknown() {
        assert_eq!(ProcessingState::label(None), "unknown");
        assert_eq!(
            ProcessingState::label(Some(ProcessingState::Failed)),
            "failed"
        );
    }

    #[test]
    fn test_list_request_clamps() {
        let req = ListDocumentsRequest::new(Some(0), Some(10_000));
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, PAGE_SIZE_MAX);
        assert_eq!(req.offset(), 0);

        let req = ListDocumentsRequest::new(Some(3), Some(20));
        assert_eq!(req.offset(), 40);
    }

    #[test]
    fn test_offset_saturates_for_huge_page() {
        let req = ListDocumentsRequest::new(Some(i64::MAX), Some(100));
        assert_eq!(req.page, i64::MAX);
        assert_eq!(req.offset(), i64::MAX);
    }

    #[test]
    fn test_total_pages() {
        let req = ListDocumentsRequest::new(Some(1), Some(10));
        assert_eq!(ListDocumentsResponse::new(vec![], 0, req).total_pages, 0);
        assert_eq!(ListDocumentsResponse::new(vec![], 10, req).total_pages, 1);
        assert_eq!(ListDocumentsResponse::new(vec![], 11, req).total_pages, 2);
    }

    #[test]
    fn test_extracted_text_concatenates_without_separator() {
        let text = ExtractedText {
            pages: vec!["one".into(), String::new(), "three".into()],
        };
        assert_eq!(text.full_text(), "onethree");
        assert_eq!(text.page_count(), 3);
    }

    #[test]
    fn test_full_text_drops_nul() {
        let text = ExtractedText {
            pages: vec!["ab\0c".into(), "\0def\n".into()],
        };
        assert_eq!(text.full_text(), "abcdef\n");
    }

    #[test]
    fn test_search_result_hides_score() {
        let result = SearchResult {
            id: Uuid::nil(),
            filename: "a.pdf".into(),
            snippet: "text".into(),
            score: 2.0,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("score").is_none());
        assert_eq!(json["snippet"], "text");
    }
}
