//! Candidate merging and ordering.
//!
//! A document matched by several sources keeps the highest source score;
//! scores are never summed. Ties break on recency, then on id, so identical
//! inputs always produce identical orderings.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use docproc_core::{MatchSource, SearchCandidate};

/// One document after merging all of its candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub best_source: MatchSource,
    pub highlight: Option<String>,
    pub content_prefix: Option<String>,
    pub content_chars: i64,
}

impl RankedDocument {
    fn from_candidate(candidate: SearchCandidate) -> Self {
        Self {
            id: candidate.document_id,
            filename: candidate.filename,
            created_at: candidate.created_at,
            score: candidate.source.score(),
            best_source: candidate.source,
            highlight: candidate.highlight,
            content_prefix: candidate.content_prefix,
            content_chars: candidate.content_chars,
        }
    }

    fn absorb(&mut self, candidate: SearchCandidate) {
        let score = candidate.source.score();
        if score > self.score {
            self.score = score;
            self.best_source = candidate.source;
        }
        if self.highlight.is_none() {
            self.highlight = candidate.highlight;
        }
        if self.content_prefix.is_none() {
            self.content_prefix = candidate.content_prefix;
        }
    }
}

/// Score desc, then newest first, then id.
pub fn result_order(a: &RankedDocument, b: &RankedDocument) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Group candidates by document, keep each document's best score, order, and
/// cap at `limit`.
pub fn rank_candidates(candidates: Vec<SearchCandidate>, limit: usize) -> Vec<RankedDocument> {
    let mut by_id: HashMap<Uuid, RankedDocument> = HashMap::new();
    for candidate in candidates {
        match by_id.get_mut(&candidate.document_id) {
            Some(existing) => existing.absorb(candidate),
            None => {
                by_id.insert(
                    candidate.document_id,
                    RankedDocument::from_candidate(candidate),
                );
            }
        }
    }

    let mut ranked: Vec<RankedDocument> = by_id.into_values().collect();
    ranked.sort_by(result_order);
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(id: u128, minute: u32, source: MatchSource) -> SearchCandidate {
        SearchCandidate {
            document_id: Uuid::from_u128(id),
            filename: format!("doc-{}.pdf", id),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, minute, 0).unwrap(),
            source,
            highlight: None,
            content_prefix: Some("content".to_string()),
            content_chars: 7,
        }
    }

    #[test]
    fn test_max_not_sum() {
        let ranked = rank_candidates(
            vec![
                candidate(1, 0, MatchSource::VectorMatch(0.3)),
                candidate(1, 0, MatchSource::TagMatch),
                candidate(1, 0, MatchSource::SubstringFallback),
            ],
            100,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, MatchSource::TagMatch.score());
        assert_eq!(ranked[0].best_source, MatchSource::TagMatch);
    }

    #[test]
    fn test_one_entry_per_document() {
        let ranked = rank_candidates(
            vec![
                candidate(1, 0, MatchSource::FilenameMatch),
                candidate(2, 0, MatchSource::TagMatch),
                candidate(1, 0, MatchSource::TagMatch),
                candidate(2, 0, MatchSource::VectorMatch(0.1)),
            ],
            100,
        );
        let ids: Vec<_> = ranked.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
    }

    #[test]
    fn test_filename_outranks_content() {
        let ranked = rank_candidates(
            vec![
                candidate(1, 30, MatchSource::VectorMatch(10.0)),
                candidate(2, 0, MatchSource::FilenameMatch),
            ],
            100,
        );
        assert_eq!(ranked[0].id, Uuid::from_u128(2));
    }

    #[test]
    fn test_ties_break_on_recency_then_id() {
        let ranked = rank_candidates(
            vec![
                candidate(3, 0, MatchSource::FilenameMatch),
                candidate(2, 5, MatchSource::FilenameMatch),
                candidate(1, 0, MatchSource::FilenameMatch),
            ],
            100,
        );
        let ids: Vec<_> = ranked.iter().map(|r| r.id.as_u128()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let mut candidates = vec![
            candidate(1, 1, MatchSource::VectorMatch(0.2)),
            candidate(2, 2, MatchSource::VectorMatch(0.2)),
            candidate(3, 3, MatchSource::TagMatch),
            candidate(4, 3, MatchSource::TagMatch),
            candidate(5, 0, MatchSource::SubstringFallback),
        ];
        let forward = rank_candidates(candidates.clone(), 100);
        candidates.reverse();
        let backward = rank_candidates(candidates, 100);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_cap() {
        let candidates = (0..150u128)
            .map(|i| candidate(i, 0, MatchSource::FilenameMatch))
            .collect();
        let ranked = rank_candidates(candidates, 100);
        assert_eq!(ranked.len(), 100);
        assert_eq!(ranked[0].id, Uuid::from_u128(0));
        assert_eq!(ranked[99].id, Uuid::from_u128(99));
    }

    #[test]
    fn test_highlight_kept_from_lower_source() {
        let mut vector = candidate(1, 0, MatchSource::VectorMatch(0.2));
        vector.highlight = Some("<b>match</b>".to_string());
        let ranked = rank_candidates(
            vec![candidate(1, 0, MatchSource::FilenameMatch), vector],
            100,
        );
        assert_eq!(ranked[0].best_source, MatchSource::FilenameMatch);
        assert_eq!(ranked[0].highlight.as_deref(), Some("<b>match</b>"));
    }
}
