//! Synthetic write workload for the watched table.

use std::time::Duration;

use feedwatch_core::{is_valid_table_name, Row};
use rand::Rng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_postgres::Client;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PgError, PgResult};

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const SOURCE_DOMAIN: &str = "noemail.com";

/// Configuration for the write generator.
#[derive(Debug, Clone)]
pub struct WriteGeneratorConfig {
    /// Table to insert into.
    pub table: String,
    /// Delay between inserts.
    pub interval: Duration,
}

impl Default for WriteGeneratorConfig {
    fn default() -> Self {
        Self {
            table: "messages".to_string(),
            interval: Duration::from_secs(1),
        }
    }
}

/// A string of `len` random lowercase ASCII letters.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// A new row with a random id and random text columns.
pub fn random_row() -> Row {
    let mut rng = rand::thread_rng();
    Row {
        id: Uuid::new_v4(),
        source: format!("{}@{}", random_string(&mut rng, 10), SOURCE_DOMAIN),
        title: random_string(&mut rng, 20),
        body: random_string(&mut rng, 20),
    }
}

/// Inserts one random row per interval on a dedicated connection.
pub struct WriteGenerator {
    client: Client,
    config: WriteGeneratorConfig,
    insert_sql: String,
}

impl WriteGenerator {
    pub fn new(client: Client, config: WriteGeneratorConfig) -> PgResult<Self> {
        if !is_valid_table_name(&config.table) {
            return Err(PgError::InvalidTableName(config.table));
        }

        let insert_sql = format!(
            "INSERT INTO {} (id, source, title, body) VALUES ($1, $2, $3, $4)",
            config.table
        );

        Ok(Self {
            client,
            config,
            insert_sql,
        })
    }

    pub async fn insert(&self, row: &Row) -> PgResult<()> {
        self.client
            .execute(
                self.insert_sql.as_str(),
                &[&row.id, &row.source, &row.title, &row.body],
            )
            .await?;
        Ok(())
    }

    /// Insert rows until `shutdown` turns true or its sender is dropped.
    ///
    /// Returns the number of rows written. The first failed insert ends the loop.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> PgResult<u64> {
        info!(
            table = %self.config.table,
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting write generator"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut written: u64 = 0;

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    let row = random_row();
                    self.insert(&row).await?;
                    written += 1;
                    debug!(id = %row.id, written, "Inserted row");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(written, "Write generator stopped");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string() {
        let mut rng = rand::thread_rng();
        let s = random_string(&mut rng, 20);
        assert_eq!(s.len(), 20);
        assert!(s.bytes().all(|b| b.is_ascii_lowercase()));
        assert!(random_string(&mut rng, 0).is_empty());
    }

    #[test]
    fn test_random_row_shape() {
        let row = random_row();
        assert_eq!(row.source.len(), 10 + 1 + SOURCE_DOMAIN.len());
        assert!(row.source.ends_with("@noemail.com"));
        assert_eq!(row.title.len(), 20);
        assert_eq!(row.body.len(), 20);
        assert_eq!(row.id.get_version_num(), 4);
    }

    #[test]
    fn test_random_rows_differ() {
        assert_ne!(random_row().id, random_row().id);
    }
}
