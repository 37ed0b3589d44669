//! Link traversal: one-hop neighbours and section-scoped graph export.

use rusqlite::{params, Connection};

use super::store::memory_exists;
use super::truncate_preview;
use super::types::{
    link_from_row, memory_columns, memory_from_row, Graph, GraphNode, Link, RelatedMemory,
};
use crate::error::{MemoryError, Result};

/// Memories linked to `memory_id` in either direction, strongest first.
///
/// Single hop only; at most `limit` results.
pub fn get_related(conn: &Connection, memory_id: &str, limit: usize) -> Result<Vec<RelatedMemory>> {
    if !memory_exists(conn, memory_id)? {
        return Err(MemoryError::NotFound(memory_id.to_string()));
    }

    let sql = format!(
        "SELECT {}, l.relationship, l.strength \
         FROM links l \
         JOIN memories m ON m.id = CASE WHEN l.source_id = ?1 THEN l.target_id ELSE l.source_id END \
         WHERE (l.source_id = ?1 OR l.target_id = ?1) AND m.id != ?1 \
         ORDER BY l.strength DESC, l.created_at DESC \
         LIMIT ?2",
        memory_columns("m")
    );
    let mut stmt = conn.prepare(&sql)?;
    let related = stmt
        .query_map(params![memory_id, limit as i64], |row| {
            Ok(RelatedMemory {
                memory: memory_from_row(row)?,
                relationship: row.get(13)?,
                strength: row.get(14)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(related)
}

/// Export memories (optionally one section) as nodes, plus every link whose
/// endpoints are both in that node set.
pub fn get_graph(conn: &Connection, section: Option<&str>) -> Result<Graph> {
    let sql = format!(
        "SELECT {} FROM memories WHERE (?1 IS NULL OR section = ?1) ORDER BY created_at, rowid",
        memory_columns("")
    );
    let memories = {
        let mut stmt = conn.prepare(&sql)?;
        let collected = stmt
            .query_map(params![section], memory_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    let edges: Vec<Link> = {
        let mut stmt = conn.prepare(
            "SELECT l.id, l.source_id, l.target_id, l.relationship, l.strength, l.created_at \
             FROM links l \
             JOIN memories s ON s.id = l.source_id \
             JOIN memories t ON t.id = l.target_id \
             WHERE ?1 IS NULL OR (s.section = ?1 AND t.section = ?1) \
             ORDER BY l.created_at, l.rowid",
        )?;
        let collected = stmt
            .query_map(params![section], link_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    let nodes = memories
        .into_iter()
        .map(|m| GraphNode {
            label: truncate_preview(&m.content, 80),
            id: m.id,
            section: m.section,
            subsection: m.subsection,
            tags: m.tags,
            importance: m.importance,
            link_count: m.link_count,
        })
        .collect();

    Ok(Graph { nodes, edges })
}
