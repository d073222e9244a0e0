//! docproc-api - HTTP API server binary

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docproc_api::{build_router, AppConfig, AppState, IngestService};
use docproc_core::DocumentRepository;
use docproc_db::{Database, FileStore};
use docproc_extract::TextExtractionAdapter;
use docproc_search::SearchEngine;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "docproc_api=debug,tower_http=debug";

/// Install the global subscriber.
///
/// `LOG_FORMAT=json` switches to JSON lines, `LOG_FILE` writes to a daily
/// rolling file instead of stdout, `LOG_ANSI` overrides colors (off for files
/// unless forced). The returned guard flushes the file writer on drop.
fn init_tracing() -> Option<WorkerGuard> {
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    let ansi_override = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| matches!(v.as_str(), "true" | "1"));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard, ansi) = match std::env::var("LOG_FILE").ok().map(PathBuf::from) {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let prefix = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "docproc-api.log".into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
            (BoxMakeWriter::new(writer), Some(guard), ansi_override.unwrap_or(false))
        }
        None => (
            BoxMakeWriter::new(std::io::stdout),
            None,
            ansi_override.unwrap_or(true),
        ),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();
    info!(
        subsystem = "api",
        version = env!("CARGO_PKG_VERSION"),
        "Starting docproc-api"
    );

    let config = AppConfig::from_env()?;

    let db = Database::connect(&config.database_url, &config.pool_config(), &config.search).await?;
    db.migrate().await?;
    info!(subsystem = "db", "Migrations applied");

    if config.reindex_on_startup {
        let updated = db.documents.backfill_search_index().await?;
        info!(
            subsystem = "db",
            op = "backfill_search_index",
            updated,
            "Search index backfill complete"
        );
    }

    let store = FileStore::open(&config.ingest.upload_dir).await?;
    store.validate().await?;
    info!(
        subsystem = "storage",
        root = %store.root().display(),
        "Storage root ready"
    );

    let extractor = TextExtractionAdapter::for_kind(config.pdf_backend);
    info!(
        subsystem = "extraction",
        backend = extractor.backend_name(),
        "PDF backend selected"
    );

    let documents: Arc<dyn DocumentRepository> = db.documents.clone();
    let state = AppState {
        documents: documents.clone(),
        tags: db.tags.clone(),
        search: SearchEngine::new(db.search.clone(), config.search.clone()),
        ingest: IngestService::new(documents, store, extractor, config.ingest.clone()),
    };
    let app = build_router(state, &config.allowed_origins);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(subsystem = "api", %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
