//! `.meridian/` directory layout.
//!
//! - `meridian.db` + WAL: turns, block logs, chats and projects.
//! - `logs/`: log files.
//! - `env`: optional dotenv file loaded by the binary before the project `.env`.

use anyhow::Context;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the per-project state directory.
pub const MERIDIAN_DIR: &str = ".meridian";
/// Basename of the main DB (SQLite creates .db-wal and .db-shm alongside).
pub const MERIDIAN_DB: &str = "meridian.db";
/// Env file under the meridian dir.
pub const ENV_FILE: &str = "env";
/// Subdir for log files.
pub const LOGS_DIR: &str = "logs";

/// Ensures `meridian_dir` and `meridian_dir/logs` exist; returns path to meridian.db.
pub fn ensure_meridian_dir_at(meridian_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(meridian_dir).context("create meridian dir")?;
    std::fs::create_dir_all(meridian_dir.join(LOGS_DIR)).context("create logs dir")?;
    Ok(meridian_dir.join(MERIDIAN_DB))
}

/// Ensures `.meridian` and `.meridian/logs` exist under `repo_root`.
pub fn ensure_meridian_dir(repo_root: &Path) -> Result<PathBuf> {
    ensure_meridian_dir_at(&repo_root.join(MERIDIAN_DIR))
}
