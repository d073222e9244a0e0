//! PostgreSQL pool setup.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use docproc_core::{Error, Result};

/// Connection pool sizing and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the pool; the floor never exceeds the cap.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Strip the password from a connection URL before it reaches a log line.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

/// Open a pool and run one round trip so a bad URL fails at startup.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    let target = redact_url(database_url);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(database_url)
        .await
        .map_err(|e| {
            warn!(
                subsystem = "database",
                component = "pool",
                target = %target,
                error = %e,
                "Could not connect to PostgreSQL"
            );
            Error::Database(e)
        })?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!(
        subsystem = "database",
        component = "pool",
        target = %target,
        max_connections = config.max_connections,
        duration_ms = start.elapsed().as_millis() as u64,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_connections_clamps_floor() {
        let config = PoolConfig {
            min_connections: 5,
            ..PoolConfig::default()
        }
        .max_connections(2);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.min_connections, 2);
        assert_eq!(PoolConfig::new().max_connections(0).max_connections, 1);
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://docproc:s3cret@db:5432/docproc"),
            "postgres://docproc:***@db:5432/docproc"
        );
        assert_eq!(
            redact_url("postgres://docproc@db/docproc"),
            "postgres://docproc@db/docproc"
        );
        assert_eq!(redact_url("postgres://db/docproc"), "postgres://db/docproc");
        assert_eq!(redact_url("not a url"), "not a url");
    }
}
