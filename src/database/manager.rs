use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Lazily connected connection pool for the application database.
///
/// The pool is created on first use and cached; a failed connect is not
/// cached, so the next caller retries.
pub struct DatabaseManager {
    config: DatabaseConfig,
    pool: RwLock<Option<PgPool>>,
}

impl DatabaseManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    /// Get existing pool or create a new one lazily
    pub async fn pool(&self) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pool = self.pool.read().await;
            if let Some(pool) = pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        // Slow path: hold the write lock across the connect so concurrent
        // first callers share one pool
        let mut slot = self.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let url = self.connection_url()?;

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.timeout())
            .connect(url.as_str())
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        *slot = Some(pool.clone());

        info!("Created database pool for: {}", redact(&url));
        Ok(pool)
    }

    /// Pings the database to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let ping = async {
            let pool = self.pool().await?;
            sqlx::query("SELECT 1").execute(&pool).await?;
            Ok::<(), DatabaseError>(())
        };

        match tokio::time::timeout(self.timeout(), ping).await {
            Ok(result) => result,
            Err(_) => Err(DatabaseError::ConnectionError(format!(
                "timed out after {}s",
                self.config.connection_timeout
            ))),
        }
    }

    /// Close the pool if one was created (e.g., on shutdown)
    pub async fn close(&self) {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            info!("Closed database pool");
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.connection_timeout.max(1))
    }

    fn connection_url(&self) -> Result<url::Url, DatabaseError> {
        let raw = self
            .config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        parse_database_url(raw)
    }
}

/// Parse and validate a postgres connection string
pub fn parse_database_url(raw: &str) -> Result<url::Url, DatabaseError> {
    let url = url::Url::parse(raw)
        .map_err(|e| DatabaseError::InvalidDatabaseUrl(e.to_string()))?;

    match url.scheme() {
        "postgres" | "postgresql" => Ok(url),
        other => Err(DatabaseError::InvalidDatabaseUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// Render a connection URL without its password, for logs
pub fn redact(url: &url::Url) -> String {
    let mut url = url.clone();
    if url.password().is_some() {
        let _ = url.set_password(Some("***"));
    }
    url.to_string()
}
