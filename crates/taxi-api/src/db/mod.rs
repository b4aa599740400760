//! # Database Persistence Layer
//!
//! Postgres persistence for the fleet via SQLx.
//!
//! The database layer is optional. When `DATABASE_URL` is set, every
//! mutation is written to PostgreSQL before it is applied in memory, and
//! the in-memory stores are hydrated from the database on startup. When
//! absent, the API runs in-memory only (development and tests).
//!
//! Sessions are never persisted; a restart logs every driver out.

pub mod cars;
pub mod drivers;
pub mod manufacturers;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 Fleet data will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Wrap a row value that failed domain validation as a decode error.
pub(crate) fn decode_error(column: &str, message: impl std::fmt::Display) -> sqlx::Error {
    tracing::error!(column, error = %message, "invalid value in database row");
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.to_string().into(),
    }
}
