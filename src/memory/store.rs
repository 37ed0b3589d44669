//! Write path: validation, embedding, storage, section registration, and
//! deletion with link bookkeeping.
//!
//! [`add_memory`] is the single entry point for new memories. It validates the
//! request, resolves the embedding through the cache, inserts the row and its
//! section inside one transaction, and then hands the new id to the
//! auto-linker. Linking runs in its own transaction: a failure there leaves a
//! valid memory with `link_count = 0` rather than failing the write.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::types::{memory_columns, memory_from_row, Memory, MemoryPatch, NewMemory, Section};
use super::{linker, now_timestamp};
use crate::config::LinkingConfig;
use crate::embedding::EmbeddingCache;
use crate::error::{MemoryError, Result};

/// Full write path: validate → embed → insert + ensure section → auto-link.
///
/// Returns the new memory's id.
pub fn add_memory(
    conn: &mut Connection,
    embeddings: &EmbeddingCache,
    new: &NewMemory,
    linking: &LinkingConfig,
) -> Result<String> {
    validate_content(&new.content)?;
    validate_section(&new.section)?;
    let importance = validate_importance(new.importance)?;
    let tags = normalize_tags(&new.tags);

    let embedding = embed_or_degrade(embeddings, &new.content);

    let id = uuid::Uuid::now_v7().to_string();
    let now = now_timestamp();
    let tags_json = serde_json::to_string(&tags)?;
    let metadata_json = new.metadata.as_ref().map(serde_json::to_string).transpose()?;
    let embedding_bytes = embedding.as_deref().map(super::embedding_to_bytes);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO memories (id, content, section, subsection, embedding, tags, importance, \
         metadata, created_at, updated_at, access_count, link_count) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 0, 0)",
        params![
            id,
            new.content,
            new.section,
            new.subsection,
            embedding_bytes,
            tags_json,
            importance,
            metadata_json,
            now,
        ],
    )?;
    ensure_section(&tx, &new.section, None, None)?;
    tx.commit()?;

    let links_created = if new.auto_link {
        match linker::auto_link(conn, &id, linking) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(memory_id = %id, error = %e, "auto-link failed, memory stored unlinked");
                0
            }
        }
    } else {
        0
    };

    tracing::info!(
        memory_id = %id,
        section = %new.section,
        importance,
        links_created,
        "memory stored"
    );
    Ok(id)
}

/// Fetch a single memory by id. Does not touch access bookkeeping.
pub fn get_memory(conn: &Connection, memory_id: &str) -> Result<Memory> {
    let sql = format!("SELECT {} FROM memories WHERE id = ?1", memory_columns(""));
    conn.query_row(&sql, params![memory_id], memory_from_row)
        .optional()?
        .ok_or_else(|| MemoryError::NotFound(memory_id.to_string()))
}

/// Apply a partial update. New content forces a fresh embedding; `updated_at`
/// is refreshed even when the patch is empty.
pub fn update_memory(
    conn: &mut Connection,
    embeddings: &EmbeddingCache,
    memory_id: &str,
    patch: &MemoryPatch,
) -> Result<()> {
    if let Some(content) = &patch.content {
        validate_content(content)?;
    }
    let importance = patch.importance.map(validate_importance).transpose()?;
    let tags_json = patch
        .tags
        .as_ref()
        .map(|t| serde_json::to_string(&normalize_tags(t)))
        .transpose()?;
    let metadata_json = patch.metadata.as_ref().map(serde_json::to_string).transpose()?;
    let embedding = patch
        .content
        .as_deref()
        .map(|c| embed_or_degrade(embeddings, c));

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !memory_exists(&tx, memory_id)? {
        return Err(MemoryError::NotFound(memory_id.to_string()));
    }

    if let (Some(content), Some(embedding)) = (&patch.content, &embedding) {
        let bytes = embedding.as_deref().map(super::embedding_to_bytes);
        tx.execute(
            "UPDATE memories SET content = ?1, embedding = ?2 WHERE id = ?3",
            params![content, bytes, memory_id],
        )?;
    }
    if let Some(tags_json) = &tags_json {
        tx.execute(
            "UPDATE memories SET tags = ?1 WHERE id = ?2",
            params![tags_json, memory_id],
        )?;
    }
    if let Some(importance) = importance {
        tx.execute(
            "UPDATE memories SET importance = ?1 WHERE id = ?2",
            params![importance, memory_id],
        )?;
    }
    if let Some(metadata_json) = &metadata_json {
        tx.execute(
            "UPDATE memories SET metadata = ?1 WHERE id = ?2",
            params![metadata_json, memory_id],
        )?;
    }
    tx.execute(
        "UPDATE memories SET updated_at = ?1 WHERE id = ?2",
        params![now_timestamp(), memory_id],
    )?;
    tx.commit()?;

    tracing::debug!(
        memory_id,
        content_changed = patch.content.is_some(),
        touch_only = patch.is_empty(),
        "memory updated"
    );
    Ok(())
}

/// Delete a memory and every link it takes part in, decrementing
/// `link_count` on each surviving endpoint.
///
/// Returns the number of link rows removed.
pub fn delete_memory(conn: &mut Connection, memory_id: &str) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let removed = delete_in_tx(&tx, memory_id)?
        .ok_or_else(|| MemoryError::NotFound(memory_id.to_string()))?;
    tx.commit()?;

    tracing::info!(memory_id, links_removed = removed, "memory deleted");
    Ok(removed)
}

/// Delete inside an existing transaction. `Ok(None)` if the memory is absent.
pub(crate) fn delete_in_tx(tx: &Transaction, memory_id: &str) -> Result<Option<usize>> {
    if !memory_exists(tx, memory_id)? {
        return Ok(None);
    }

    // One entry per link row, so a neighbour linked twice is decremented twice.
    let neighbours: Vec<String> = {
        let mut stmt = tx.prepare(
            "SELECT CASE WHEN source_id = ?1 THEN target_id ELSE source_id END \
             FROM links WHERE (source_id = ?1 OR target_id = ?1) AND source_id != target_id",
        )?;
        let collected = stmt
            .query_map(params![memory_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    {
        let mut stmt = tx.prepare(
            "UPDATE memories SET link_count = MAX(link_count - 1, 0) WHERE id = ?1",
        )?;
        for neighbour in &neighbours {
            stmt.execute(params![neighbour])?;
        }
    }

    let removed = tx.execute(
        "DELETE FROM links WHERE source_id = ?1 OR target_id = ?1",
        params![memory_id],
    )?;
    tx.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;

    Ok(Some(removed))
}

/// Register a section if it does not exist yet. Safe under concurrent callers:
/// a duplicate name is ignored, never surfaced. Returns `true` if a row was created.
pub fn ensure_section(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    parent: Option<&str>,
) -> Result<bool> {
    validate_section(name)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO sections (id, name, description, parent, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            uuid::Uuid::now_v7().to_string(),
            name,
            description,
            parent,
            now_timestamp()
        ],
    )?;
    if inserted > 0 {
        tracing::debug!(section = name, "section created");
    }
    Ok(inserted > 0)
}

/// All registered sections, by name.
pub fn list_sections(conn: &Connection) -> Result<Vec<Section>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, parent, created_at FROM sections ORDER BY name",
    )?;
    let sections = stmt
        .query_map([], |row| {
            Ok(Section {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                parent: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(sections)
}

pub(crate) fn memory_exists(conn: &Connection, memory_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM memories WHERE id = ?1)",
        params![memory_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Resolve an embedding, storing the memory without one if the provider fails.
fn embed_or_degrade(embeddings: &EmbeddingCache, content: &str) -> Option<Vec<f32>> {
    match embeddings.get_or_compute(content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "embedding unavailable, storing without vector");
            None
        }
    }
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(MemoryError::validation("content", "must not be empty"));
    }
    Ok(())
}

fn validate_section(section: &str) -> Result<()> {
    if section.trim().is_empty() {
        return Err(MemoryError::validation("section", "must not be empty"));
    }
    Ok(())
}

fn validate_importance(importance: i64) -> Result<u8> {
    if !(1..=10).contains(&importance) {
        return Err(MemoryError::validation(
            "importance",
            format!("must be between 1 and 10, got {importance}"),
        ));
    }
    Ok(importance as u8)
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
