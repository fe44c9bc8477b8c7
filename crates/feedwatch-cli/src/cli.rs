use std::path::PathBuf;

use clap::Parser;
use feedwatch_core::Cursor;

#[derive(Debug, Parser)]
#[command(name = "feedwatch")]
#[command(about = "Tail a CockroachDB changefeed while writing synthetic rows into the watched table")]
#[command(version)]
pub struct Cli {
    /// Start changefeed from specified resolved timestamp (like 1586782034314054700.0000000000)
    #[arg(short = 'c', long = "cursor", value_parser = Cursor::parse)]
    pub cursor: Option<Cursor>,

    /// Path to feedwatch.toml config file (optional)
    #[arg(long, default_value = "feedwatch.toml")]
    pub config: PathBuf,

    /// Table to watch and write into (overrides config)
    #[arg(long)]
    pub table: Option<String>,

    /// Delay between synthetic inserts in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Only consume the changefeed, do not write rows
    #[arg(long)]
    pub no_writer: bool,
}
