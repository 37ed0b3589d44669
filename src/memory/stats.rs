use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;

/// Response from memory_stats.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub total_memories: u64,
    pub average_importance: f64,
    pub total_access_count: u64,
    pub average_link_count: f64,
    /// Store-wide, regardless of the section filter.
    pub total_sections: u64,
    /// Links whose source is in the section (all links when unfiltered).
    pub total_links: u64,
}

/// Compute aggregate statistics, optionally scoped to one section.
pub fn memory_stats(conn: &Connection, section: Option<&str>) -> Result<StatsResponse> {
    let (total, avg_importance, total_access, avg_links): (i64, f64, i64, f64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(AVG(importance), 0.0), COALESCE(SUM(access_count), 0), \
         COALESCE(AVG(link_count), 0.0) \
         FROM memories WHERE ?1 IS NULL OR section = ?1",
        params![section],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let total_sections: i64 =
        conn.query_row("SELECT COUNT(*) FROM sections", [], |row| row.get(0))?;

    let total_links: i64 = conn.query_row(
        "SELECT COUNT(*) FROM links l JOIN memories m ON m.id = l.source_id \
         WHERE ?1 IS NULL OR m.section = ?1",
        params![section],
        |row| row.get(0),
    )?;

    Ok(StatsResponse {
        section: section.map(str::to_string),
        total_memories: total as u64,
        average_importance: avg_importance,
        total_access_count: total_access as u64,
        average_link_count: avg_links,
        total_sections: total_sections as u64,
        total_links: total_links as u64,
    })
}
