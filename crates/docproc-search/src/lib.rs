//! # docproc-search
//!
//! Multi-source document search with a fixed scoring policy.
//!
//! Candidates come from a [`docproc_core::SearchSource`]; this crate sanitizes
//! the query, merges candidates per document by maximum score, orders them,
//! caps the result list, and builds snippets.

pub mod engine;
pub mod query;
pub mod ranking;
pub mod snippet;

pub use engine::SearchEngine;
pub use query::sanitize_query;
pub use ranking::{rank_candidates, RankedDocument};
pub use snippet::build_snippet;
