//! # docproc-db
//!
//! Persistence layer for docproc.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repositories for documents, processing status, and tags
//! - Search candidate queries over tsvector, filenames, and tag names
//! - Filesystem storage for uploaded files with staged writes
//! - An in-memory store implementing the same traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use docproc_db::{Database, PoolConfig, SearchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect(
//!         "postgres://localhost/docproc",
//!         &PoolConfig::default(),
//!         &SearchConfig::default(),
//!     )
//!     .await?;
//!     let tags = db.tags.list().await?;
//!     println!("{} tags", tags.len());
//!     Ok(())
//! }
//! ```
pub mod documents;
pub mod file_storage;
pub mod memory;
pub mod pool;
pub mod search;
pub mod tags;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use docproc_core::*;

pub use documents::PgDocumentRepository;
pub use file_storage::{FileStore, StagedFile};
pub use memory::MemoryStore;
pub use pool::{connect_pool, redact_url, PoolConfig};
pub use search::PgSearchSource;
pub use tags::PgTagRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// PostgreSQL-backed repositories sharing one pool.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Postgres>,
    pub documents: std::sync::Arc<PgDocumentRepository>,
    pub tags: std::sync::Arc<PgTagRepository>,
    pub search: std::sync::Arc<PgSearchSource>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>, search: &SearchConfig) -> Self {
        Self {
            documents: std::sync::Arc::new(PgDocumentRepository::new(
                pool.clone(),
                search.text_search_config.clone(),
            )),
            tags: std::sync::Arc::new(PgTagRepository::new(pool.clone())),
            search: std::sync::Arc::new(PgSearchSource::new(pool.clone(), search)),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str, config: &PoolConfig, search: &SearchConfig) -> Result<Self> {
        let pool = connect_pool(url, config).await?;
        Ok(Self::new(pool, search))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
