//! Persistence for labels, images, their annotation sets, and comments.
//!
//! Callers program against the [`AnnotationStore`] trait. Two
//! implementations exist:
//!
//! - [`PgStore`]: PostgreSQL via sqlx, using the repositories in
//!   [`repositories`] and the embedded migrations.
//! - [`MemoryStore`]: process-local maps with per-image locks, used when no
//!   database is configured and throughout the test suites.

use pictura_core::error::CoreError;
use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use store::AnnotationStore;

pub type DbPool = sqlx::PgPool;

/// Error returned by every [`AnnotationStore`] operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain-level error (missing entity, invalid label, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: pictura_core::types::DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
