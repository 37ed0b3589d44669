//! Bounded relationship inference.
//!
//! For one memory, scan a recency-ordered window of same-section candidates
//! that still have link budget, keep those whose cosine similarity strictly
//! exceeds the threshold, and link the strongest ones up to the fan-out cap.
//! Cost per call is bounded by the window size, not by the store size.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{bytes_to_embedding, cosine_similarity, now_timestamp, RELATED_TO};
use crate::config::LinkingConfig;
use crate::error::{MemoryError, Result};

/// Same-section rows with a vector and link budget that are not yet linked
/// to `?2`, most recent first.
pub(crate) const CANDIDATE_WINDOW_SQL: &str = "SELECT m.id, m.embedding FROM memories m \
     WHERE m.section = ?1 \
       AND m.id != ?2 \
       AND m.embedding IS NOT NULL \
       AND m.link_count < ?3 \
       AND NOT EXISTS ( \
           SELECT 1 FROM links l \
           WHERE (l.source_id = ?2 AND l.target_id = m.id) \
              OR (l.source_id = m.id AND l.target_id = ?2)) \
     ORDER BY m.created_at DESC, m.rowid DESC \
     LIMIT ?4";

/// Link `memory_id` against its candidate window. Returns the number of links created.
///
/// Silently creates nothing if the memory has no embedding or no remaining
/// budget. Pairs that are already linked are never linked again, so this can
/// be re-run for a memory whose first pass was interrupted.
pub fn auto_link(conn: &mut Connection, memory_id: &str, config: &LinkingConfig) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let row: Option<(String, Option<Vec<u8>>, u32)> = tx
        .query_row(
            "SELECT section, embedding, link_count FROM memories WHERE id = ?1",
            params![memory_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let (section, embedding_bytes, link_count) =
        row.ok_or_else(|| MemoryError::NotFound(memory_id.to_string()))?;

    let Some(embedding_bytes) = embedding_bytes else {
        tracing::debug!(memory_id, "no embedding, skipping auto-link");
        return Ok(0);
    };
    let embedding = bytes_to_embedding(&embedding_bytes);

    let budget = config.max_links_per_memory.saturating_sub(link_count) as usize;
    if budget == 0 {
        return Ok(0);
    }

    // 1. Candidate window: same section, has a vector, has budget, not yet linked
    let window: Vec<(String, Vec<f32>)> = {
        let mut stmt = tx.prepare(CANDIDATE_WINDOW_SQL)?;
        let collected = stmt
            .query_map(
                params![
                    section,
                    memory_id,
                    config.max_links_per_memory,
                    config.batch_size as i64
                ],
                |row| {
                    let bytes: Vec<u8> = row.get(1)?;
                    Ok((row.get::<_, String>(0)?, bytes_to_embedding(&bytes)))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    // 2. Score, threshold, keep the strongest within budget
    let mut scored: Vec<(String, f32)> = window
        .into_iter()
        .map(|(id, candidate)| {
            let similarity = cosine_similarity(&embedding, &candidate);
            (id, similarity)
        })
        .filter(|(_, similarity)| *similarity > config.similarity_threshold)
        .collect();
    let window_hits = scored.len();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(budget);

    // 3. Persist links and bump both endpoints
    let now = now_timestamp();
    {
        let mut insert = tx.prepare(
            "INSERT INTO links (id, source_id, target_id, relationship, strength, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut bump = tx.prepare(
            "UPDATE memories SET link_count = link_count + 1 WHERE id = ?1",
        )?;
        for (candidate_id, similarity) in &scored {
            let strength = f64::from(similarity.clamp(0.0, 1.0));
            insert.execute(params![
                uuid::Uuid::now_v7().to_string(),
                memory_id,
                candidate_id,
                RELATED_TO,
                strength,
                now,
            ])?;
            bump.execute(params![memory_id])?;
            bump.execute(params![candidate_id])?;
        }
    }
    tx.commit()?;

    tracing::debug!(
        memory_id,
        section = %section,
        above_threshold = window_hits,
        links_created = scored.len(),
        "auto-link complete"
    );
    Ok(scored.len())
}

/// Recompute every `link_count` from the link rows. Returns how many memories
/// were corrected.
pub fn repair_link_counts(conn: &Connection) -> Result<usize> {
    let corrected = conn.execute(
        "UPDATE memories SET link_count = ( \
             SELECT COUNT(*) FROM links l WHERE l.source_id = memories.id OR l.target_id = memories.id) \
         WHERE link_count != ( \
             SELECT COUNT(*) FROM links l WHERE l.source_id = memories.id OR l.target_id = memories.id)",
        [],
    )?;
    if corrected > 0 {
        tracing::warn!(corrected, "repaired drifted link counts");
    }
    Ok(corrected)
}
