//! Server configuration loaded from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `HOST` / `PORT` | `0.0.0.0` / `8000` |
//! | `UPLOAD_DIR` | `/tmp/docproc_uploads` |
//! | `MAX_UPLOAD_SIZE_BYTES` | `52428800` |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` |
//! | `TEXT_SEARCH_CONFIG` | `portuguese` |
//! | `PDF_BACKEND` | `lopdf` |
//! | `REINDEX_ON_STARTUP` | `true` |
//! | `DB_MAX_CONNECTIONS` | `10` |

use std::path::PathBuf;
use std::str::FromStr;

use docproc_core::{defaults, Error, IngestConfig, Result, SearchConfig};
use docproc_db::PoolConfig;
use docproc_extract::BackendKind;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub pdf_backend: BackendKind,
    pub reindex_on_startup: bool,
    pub db_max_connections: u32,
    pub ingest: IngestConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// Every missing or malformed variable is collected so a single error
    /// names all of them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems: Vec<String> = Vec::new();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| {
            problems.push("DATABASE_URL is required".to_string());
            String::new()
        });

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&mut problems, "PORT", get("PORT"), defaults::SERVER_PORT);
        let max_upload_bytes = parse_or(
            &mut problems,
            "MAX_UPLOAD_SIZE_BYTES",
            get("MAX_UPLOAD_SIZE_BYTES"),
            defaults::MAX_UPLOAD_SIZE_BYTES,
        );
        let db_max_connections = parse_or(
            &mut problems,
            "DB_MAX_CONNECTIONS",
            get("DB_MAX_CONNECTIONS"),
            DEFAULT_DB_MAX_CONNECTIONS,
        );
        let reindex_on_startup = match get("REINDEX_ON_STARTUP") {
            None => true,
            Some(v) => match parse_bool(&v) {
                Some(b) => b,
                None => {
                    problems.push(format!("REINDEX_ON_STARTUP: expected a boolean, got '{}'", v));
                    true
                }
            },
        };
        let pdf_backend = match get("PDF_BACKEND") {
            None => BackendKind::default(),
            Some(v) => BackendKind::from_str(&v).unwrap_or_else(|e| {
                problems.push(format!("PDF_BACKEND: {}", e));
                BackendKind::default()
            }),
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| defaults::CORS_ORIGIN.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let ingest = IngestConfig {
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::UPLOAD_DIR)),
            max_upload_bytes,
        };
        let search = SearchConfig {
            text_search_config: get("TEXT_SEARCH_CONFIG")
                .unwrap_or_else(|| defaults::TEXT_SEARCH_CONFIG.to_string()),
            ..SearchConfig::default()
        };

        if !problems.is_empty() {
            return Err(Error::Config(problems.join("; ")));
        }

        Ok(Self {
            database_url,
            host,
            port,
            allowed_origins,
            pdf_backend,
            reindex_on_startup,
            db_max_connections,
            ingest,
            search,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new().max_connections(self.db_max_connections)
    }
}

fn parse_or<T: FromStr>(problems: &mut Vec<String>, key: &str, raw: Option<String>, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|e| {
            problems.push(format!("{}: {}", key, e));
            default
        }),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
