//! # Database
//!
//! Postgres pool setup and schema migrations for the cache, escalation queue,
//! lookup log and retry queue tables.

pub mod connection;

pub use connection::DatabaseConnection;

use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{LookupError, Result};

/// Apply the embedded `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| LookupError::Database(e.into()))?;

    info!("📜 Database migrations applied");
    Ok(())
}

/// Connect and, unless disabled, migrate
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let connection = DatabaseConnection::new(config).await?;
    if !config.skip_migrations {
        run_migrations(connection.pool()).await?;
    }
    Ok(connection)
}
