//! Database migration management.

use sqlx::SqlitePool;

use crate::error::StoreError;

/// Run all pending database migrations.
///
/// Migrations are embedded at compile time from the `migrations/` directory
/// and applied in filename order.
///
/// # Errors
///
/// Returns `StoreError::MigrationFailed` if any migration fails to apply.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    tracing::debug!("Running mapping store migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(StoreError::MigrationFailed)?;

    Ok(())
}
