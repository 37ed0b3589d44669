pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: i64 = 5000;

/// Open (or create) the recollect database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Busy handler first: switching to WAL needs the lock too
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
    // WAL lets readers proceed while a writer holds the lock
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, serde::Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: u32,
    pub embedding_dimensions: Option<usize>,
    pub memory_count: u64,
    pub link_count: u64,
    pub section_count: u64,
    /// Memories whose stored `link_count` disagrees with their link rows.
    pub link_count_drift: u64,
    /// Memories whose section has no row in `sections`.
    pub orphan_sections: u64,
}

/// Run integrity and consistency checks against an open database.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let integrity_details: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .context("integrity check failed to run")?;
    let integrity_ok = integrity_details == "ok";

    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    Ok(HealthReport {
        integrity_ok,
        integrity_details,
        schema_version: migrations::get_schema_version(conn)?,
        embedding_dimensions: migrations::get_embedding_dimensions(conn)?,
        memory_count: count("SELECT COUNT(*) FROM memories")?,
        link_count: count("SELECT COUNT(*) FROM links")?,
        section_count: count("SELECT COUNT(*) FROM sections")?,
        link_count_drift: count(
            "SELECT COUNT(*) FROM memories m \
             WHERE m.link_count != (SELECT COUNT(*) FROM links l \
                                    WHERE l.source_id = m.id OR l.target_id = m.id)",
        )?,
        orphan_sections: count(
            "SELECT COUNT(*) FROM memories m \
             WHERE NOT EXISTS (SELECT 1 FROM sections s WHERE s.name = m.section)",
        )?,
    })
}

/// `EXPLAIN QUERY PLAN` details for `sql`, one step per line.
#[cfg(test)]
pub(crate) fn explain_query_plan(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<String> {
    let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
    let steps = stmt
        .query_map(params, |row| row.get::<_, String>(3))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(steps.join("\n"))
}
