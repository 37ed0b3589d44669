//! Duplicate detection and merging.
//!
//! [`find_duplicates`] is a bounded pairwise scan (no index): it compares the
//! first `scan_limit` memories that have embeddings. [`merge_duplicates`]
//! resolves the pairs it reports.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::bytes_to_embedding;
use super::cosine_similarity;
use super::store::delete_in_tx;
use super::types::{DuplicatePair, MergeResult, MergeStrategy};
use crate::error::Result;

/// All pairs among the first `scan_limit` embedded memories whose cosine
/// similarity exceeds `threshold`, most similar first.
pub fn find_duplicates(
    conn: &Connection,
    threshold: f32,
    scan_limit: usize,
) -> Result<Vec<DuplicatePair>> {
    let rows: Vec<(String, Vec<f32>)> = {
        let mut stmt = conn.prepare(
            "SELECT id, embedding FROM memories WHERE embedding IS NOT NULL \
             ORDER BY created_at, rowid LIMIT ?1",
        )?;
        let collected = stmt
            .query_map(params![scan_limit as i64], |row| {
                let bytes: Vec<u8> = row.get(1)?;
                Ok((row.get::<_, String>(0)?, bytes_to_embedding(&bytes)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    let mut pairs = Vec::new();
    for (i, (first_id, first)) in rows.iter().enumerate() {
        for (second_id, second) in &rows[i + 1..] {
            let similarity = cosine_similarity(first, second);
            if similarity > threshold {
                pairs.push(DuplicatePair {
                    first_id: first_id.clone(),
                    second_id: second_id.clone(),
                    similarity,
                });
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::debug!(scanned = rows.len(), pairs = pairs.len(), threshold, "duplicate scan complete");
    Ok(pairs)
}

/// Resolve duplicate pairs. With [`MergeStrategy::KeepNewer`] the older
/// memory of each pair is deleted (link counts on its neighbours are adjusted
/// as for a normal delete). Pairs with a member already gone are skipped.
pub fn merge_duplicates(
    conn: &mut Connection,
    pairs: &[DuplicatePair],
    strategy: MergeStrategy,
) -> Result<MergeResult> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut result = MergeResult::default();

    for pair in pairs {
        let first = created_key(&tx, &pair.first_id)?;
        let second = created_key(&tx, &pair.second_id)?;

        let victim = match (strategy, first, second) {
            (MergeStrategy::KeepNewer, Some(a), Some(b)) => {
                if a <= b {
                    &pair.first_id
                } else {
                    &pair.second_id
                }
            }
            _ => {
                result.skipped += 1;
                continue;
            }
        };

        if delete_in_tx(&tx, victim)?.is_some() {
            result.deleted.push(victim.clone());
        }
    }
    tx.commit()?;

    tracing::info!(
        strategy = %strategy,
        deleted = result.deleted.len(),
        skipped = result.skipped,
        "duplicates merged"
    );
    Ok(result)
}

/// `(created_at, rowid)`: chronological order with insertion order as the tiebreak.
fn created_key(conn: &Connection, memory_id: &str) -> Result<Option<(String, i64)>> {
    let key = conn
        .query_row(
            "SELECT created_at, rowid FROM memories WHERE id = ?1",
            params![memory_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::embedding_to_bytes;

    fn insert_raw(conn: &Connection, id: &str, embedding: Option<&[f32]>, created_at: &str) {
        conn.execute(
            "INSERT INTO memories (id, content, section, embedding, created_at, updated_at) \
             VALUES (?1, ?1, 's', ?2, ?3, ?3)",
            params![id, embedding.map(embedding_to_bytes), created_at],
        )
        .unwrap();
    }

    fn exists(conn: &Connection, id: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM memories WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn finds_only_pairs_above_threshold() {
        let conn = db::open_memory_database().unwrap();
        insert_raw(&conn, "a", Some(&[1.0, 0.0]), "2026-01-01T00:00:01.000000Z");
        insert_raw(&conn, "b", Some(&[0.999, 0.02]), "2026-01-01T00:00:02.000000Z");
        insert_raw(&conn, "c", Some(&[0.0, 1.0]), "2026-01-01T00:00:03.000000Z");
        insert_raw(&conn, "d", None, "2026-01-01T00:00:04.000000Z");

        let pairs = find_duplicates(&conn, 0.95, 1000).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first_id, "a");
        assert_eq!(pairs[0].second_id, "b");
        assert!(pairs[0].similarity > 0.95);
    }

    #[test]
    fn scan_is_bounded() {
        let conn = db::open_memory_database().unwrap();
        insert_raw(&conn, "a", Some(&[1.0, 0.0]), "2026-01-01T00:00:01.000000Z");
        insert_raw(&conn, "b", Some(&[0.0, 1.0]), "2026-01-01T00:00:02.000000Z");
        insert_raw(&conn, "c", Some(&[1.0, 0.0]), "2026-01-01T00:00:03.000000Z");

        // "c" duplicates "a" but falls outside a two-row scan
        assert!(find_duplicates(&conn, 0.95, 2).unwrap().is_empty());
        assert_eq!(find_duplicates(&conn, 0.95, 3).unwrap().len(), 1);
    }

    #[test]
    fn merge_keeps_newer() {
        let mut conn = db::open_memory_database().unwrap();
        insert_raw(&conn, "old", Some(&[1.0, 0.0]), "2026-01-01T00:00:01.000000Z");
        insert_raw(&conn, "new", Some(&[1.0, 0.0]), "2026-01-01T00:00:02.000000Z");

        // Order within the pair must not matter
        let pairs = vec![DuplicatePair {
            first_id: "new".into(),
            second_id: "old".into(),
            similarity: 1.0,
        }];
        let result = merge_duplicates(&mut conn, &pairs, MergeStrategy::KeepNewer).unwrap();

        assert_eq!(result.deleted, vec!["old".to_string()]);
        assert!(exists(&conn, "new"));
        assert!(!exists(&conn, "old"));
    }

    #[test]
    fn merge_skips_pairs_with_missing_members() {
        let mut conn = db::open_memory_database().unwrap();
        insert_raw(&conn, "a", Some(&[1.0, 0.0]), "2026-01-01T00:00:01.000000Z");
        insert_raw(&conn, "b", Some(&[1.0, 0.0]), "2026-01-01T00:00:02.000000Z");
        insert_raw(&conn, "c", Some(&[1.0, 0.0]), "2026-01-01T00:00:03.000000Z");

        let pairs = find_duplicates(&conn, 0.95, 1000).unwrap();
        assert_eq!(pairs.len(), 3);

        let result = merge_duplicates(&mut conn, &pairs, MergeStrategy::KeepNewer).unwrap();
        assert!(exists(&conn, "c"), "newest memory always survives");
        assert_eq!(result.deleted.len() + result.skipped, 3);
        assert_eq!(result.deleted.len(), 2);
    }
}
