//! Service layer for business logic.

pub mod ingest;

pub use ingest::IngestService;
