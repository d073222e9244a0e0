//! # docproc-core
//!
//! Core types, traits, and upload safety checks for docproc.
//!
//! This crate provides the data model, the error taxonomy, the filename
//! sanitizer, path guard and upload validator, and the collaborator traits
//! that the other docproc crates implement.

pub mod config;
pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod models;
pub mod search;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{IngestConfig, SearchConfig};
pub use error::{Error, ExtractionFailure, Result, UploadRejection};
pub use file_safety::{has_pdf_signature, is_within_root, sanitize_filename, validate_upload};
pub use models::*;
pub use search::*;
pub use tags::normalize_tag_name;
pub use traits::*;

/// Generate a new time-ordered document or tag id.
pub fn new_v7() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
