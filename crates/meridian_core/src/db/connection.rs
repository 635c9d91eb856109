//! Open the DB with WAL and migrations.

use anyhow::Context;
use std::path::Path;

use super::migrations;
use crate::error::Result;

/// Opens (or creates) the DB file at `db_path`, enables WAL, runs migrations.
pub fn open_db_file(db_path: &Path) -> Result<rusqlite::Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("create db parent dir")?;
    }
    let conn = rusqlite::Connection::open(db_path).context("open meridian.db")?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000; PRAGMA foreign_keys=ON;")?;
    migrations::run_all(&conn)?;
    tracing::debug!(db.path = %db_path.display(), "opened turn store");
    Ok(conn)
}

/// Private in-memory DB with the schema applied.
pub fn open_in_memory() -> Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    migrations::run_all(&conn)?;
    Ok(conn)
}
