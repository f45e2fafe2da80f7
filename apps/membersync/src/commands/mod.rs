//! Subcommand implementations.

pub mod accounts;
pub mod legacy;
pub mod sync;

use membersync_db::SqliteMappingStore;
use tracing::debug;

use crate::config::StoreSettings;
use crate::error::AppResult;

/// Open the mapping store named by `DATABASE_URL`, applying migrations.
pub(crate) async fn open_store(settings: &StoreSettings) -> AppResult<SqliteMappingStore> {
    debug!(database_url = %settings.database_url, "Opening mapping store");
    Ok(SqliteMappingStore::connect(&settings.database_url).await?)
}
