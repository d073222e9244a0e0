//! Match sources and the scoring policy shared by every search backend.
//!
//! | Source              | Score                      |
//! |---------------------|----------------------------|
//! | `FilenameMatch`     | 2.0                        |
//! | `TagMatch`          | 1.5                        |
//! | `VectorMatch(rank)` | 1.0 + min(rank, 0.49)      |
//! | `SubstringFallback` | 0.5                        |
//!
//! Capping the vector rank keeps every full-text hit strictly between the
//! substring fallback and tag matches, whatever the backend's raw rank.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Score of a case-insensitive filename hit.
pub const FILENAME_MATCH_SCORE: f64 = 2.0;

/// Score of a case-insensitive tag name hit.
pub const TAG_MATCH_SCORE: f64 = 1.5;

/// Base score of a full-text index hit, before adding the capped rank.
pub const VECTOR_MATCH_BASE: f64 = 1.0;

/// Upper bound applied to the full-text rank.
pub const VECTOR_RANK_CAP: f64 = 0.49;

/// Score of a substring hit against unindexed content.
pub const SUBSTRING_FALLBACK_SCORE: f64 = 0.5;

/// Why a document matched a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "rank", rename_all = "snake_case")]
pub enum MatchSource {
    /// Full-text index hit with the backend's raw rank.
    VectorMatch(f64),
    FilenameMatch,
    TagMatch,
    /// Substring hit on content that has no pre-computed index.
    SubstringFallback,
}

impl MatchSource {
    pub fn score(&self) -> f64 {
        match self {
            Self::VectorMatch(rank) => {
                VECTOR_MATCH_BASE + rank.clamp(0.0, VECTOR_RANK_CAP)
            }
            Self::FilenameMatch => FILENAME_MATCH_SCORE,
            Self::TagMatch => TAG_MATCH_SCORE,
            Self::SubstringFallback => SUBSTRING_FALLBACK_SCORE,
        }
    }

    /// Short label used in logs and SQL result rows.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VectorMatch(_) => "vector",
            Self::FilenameMatch => "filename",
            Self::TagMatch => "tag",
            Self::SubstringFallback => "substring",
        }
    }

    /// Rebuild a source from its label and rank.
    pub fn from_label(label: &str, rank: f64) -> Option<Self> {
        match label {
            "vector" => Some(Self::VectorMatch(rank)),
            "filename" => Some(Self::FilenameMatch),
            "tag" => Some(Self::TagMatch),
            "substring" => Some(Self::SubstringFallback),
            _ => None,
        }
    }
}

/// A single (document, source) pair produced by a search backend.
///
/// One document may appear several times, once per source that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub document_id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub source: MatchSource,
    /// Highlighted excerpt, present for vector matches.
    pub highlight: Option<String>,
    /// Leading characters of the content, at most the snippet length.
    pub content_prefix: Option<String>,
    /// Length of the full content in characters.
    pub content_chars: i64,
}
