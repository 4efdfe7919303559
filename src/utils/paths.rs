//! Where jarvis keeps its per-user files.
//!
//! Layout under the data directory:
//! `memory.db` (SQLite session store), `models/` (embedding model cache),
//! `.env` (user-level environment).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Overrides the per-user data directory.
pub const DATA_DIR_ENV: &str = "JARVIS_DATA_DIR";

const APP_DIR: &str = "jarvis";
const MEMORY_DB: &str = "memory.db";
const MODEL_CACHE: &str = "models";
const ENV_FILE: &str = ".env";

/// The data directory, created on first use.
///
/// `JARVIS_DATA_DIR` wins; otherwise `<platform data dir>/jarvis`
/// (e.g. `~/.local/share/jarvis`), or the temp dir when the platform has none.
pub fn data_dir() -> Result<PathBuf> {
    let path = resolve_data_dir(
        std::env::var_os(DATA_DIR_ENV).map(PathBuf::from),
        dirs::data_dir(),
    );
    ensure_dir(&path)?;
    Ok(path)
}

fn resolve_data_dir(explicit: Option<PathBuf>, platform: Option<PathBuf>) -> PathBuf {
    match explicit {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => platform.unwrap_or_else(std::env::temp_dir).join(APP_DIR),
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory {}", path.display()))?;
    }
    Ok(())
}

/// Default SQLite file for session memory.
pub fn memory_db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(MEMORY_DB))
}

/// Cache for downloaded embedding models.
pub fn embedding_cache_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join(MODEL_CACHE))
}

/// User-level `.env`, if one has been written.
pub fn user_env_file() -> Option<PathBuf> {
    let path = data_dir().ok()?.join(ENV_FILE);
    path.is_file().then_some(path)
}
