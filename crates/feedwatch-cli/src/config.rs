use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use feedwatch_core::{is_valid_table_name, Cursor};

use crate::cli::Cli;

/// Used when neither the config file nor `DATABASE_URL` names a database.
pub const DEFAULT_CONNECTION_STRING: &str =
    "postgresql://root@localhost:26257/defaultdb?sslmode=disable";

/// Project configuration from feedwatch.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub postgres: PostgresConfig,
    pub feed: FeedConfig,
    pub writer: WriterConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub connection_string: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub table: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            table: "messages".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
        }
    }
}

impl ProjectConfig {
    /// Load the config file, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Resolve environment variables in a string.
    /// Supports ${VAR_NAME} syntax; unset variables resolve to an empty string.
    pub fn resolve_env(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut rest = s;

        while let Some(start) = rest.find("${") {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            let var_name = &rest[start + 2..start + end];
            result.push_str(&rest[..start]);
            result.push_str(&std::env::var(var_name).unwrap_or_default());
            rest = &rest[start + end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Get the resolved Postgres connection string.
    pub fn postgres_connection_string(&self) -> Result<String> {
        match &self.postgres.connection_string {
            Some(raw) => {
                let resolved = Self::resolve_env(raw);
                if resolved.trim().is_empty() {
                    bail!(
                        "postgres.connection_string '{}' resolved to an empty string. \
                        Is the referenced environment variable set?",
                        raw
                    );
                }
                Ok(resolved)
            }
            None => Ok(std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONNECTION_STRING.to_string())),
        }
    }
}

/// Everything a run needs, after merging the config file with command line flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub connection_string: String,
    pub table: String,
    pub cursor: Option<Cursor>,
    pub writer_enabled: bool,
    pub write_interval: Duration,
}

impl RunSettings {
    pub fn resolve(config: &ProjectConfig, cli: &Cli) -> Result<Self> {
        let table = cli
            .table
            .clone()
            .unwrap_or_else(|| config.feed.table.clone());
        if !is_valid_table_name(&table) {
            bail!(
                "Invalid table name '{}': expected an identifier like messages or public.messages",
                table
            );
        }

        let interval_ms = cli.interval_ms.unwrap_or(config.writer.interval_ms);
        if interval_ms == 0 {
            bail!("Write interval must be greater than zero");
        }

        Ok(Self {
            connection_string: config.postgres_connection_string()?,
            table,
            cursor: cli.cursor.clone(),
            writer_enabled: config.writer.enabled && !cli.no_writer,
            write_interval: Duration::from_millis(interval_ms),
        })
    }
}
