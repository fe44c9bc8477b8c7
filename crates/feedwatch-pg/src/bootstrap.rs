//! Creation of the watched table.

use feedwatch_core::is_valid_table_name;
use tokio_postgres::Client;
use tracing::info;

use crate::error::{PgError, PgResult};

/// DDL for the watched table.
pub fn create_table_statement(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
    id UUID PRIMARY KEY,
    source STRING NOT NULL,
    title STRING NOT NULL,
    body STRING NOT NULL
)",
        table
    )
}

/// Create the watched table if it does not exist yet.
pub async fn ensure_table(client: &Client, table: &str) -> PgResult<()> {
    if !is_valid_table_name(table) {
        return Err(PgError::InvalidTableName(table.to_string()));
    }

    client.batch_execute(&create_table_statement(table)).await?;
    info!(table = %table, "Table ready");

    Ok(())
}
