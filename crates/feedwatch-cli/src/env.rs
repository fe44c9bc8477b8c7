use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// Load the closest .env file, searching from the current directory up to the
/// filesystem root. Returns the loaded path, or `None` if there is no .env file.
///
/// Variables already present in the process environment are not overwritten.
pub fn load_dotenv_from_ancestors() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    for dir in cwd.ancestors() {
        let env_path = dir.join(".env");
        if env_path.exists() {
            dotenvy::from_path(&env_path)
                .with_context(|| format!("Failed to load .env from {}", env_path.display()))?;
            debug!(path = %env_path.display(), "Loaded .env");
            return Ok(Some(env_path));
        }
    }

    Ok(None)
}
