use std::collections::{BTreeSet, HashSet};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};

use super::types::{memory_columns, memory_from_row, Memory, ScoredMemory};
use super::{cosine_similarity, now_timestamp};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingCache;
use crate::error::Result;

// ── Public types ──────────────────────────────────────────────────────────────

/// Filters applied by the pre-filter query, before any scoring.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Exact section match.
    pub section: Option<String>,
    /// Every tag listed here must be present on the memory.
    pub tags: Vec<String>,
}

impl SearchFilter {
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            tags: Vec::new(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Hybrid search: embed query → bounded pre-filter → score → top-k → track access.
///
/// A blank query, or a query the provider cannot embed, ranks on keyword
/// overlap and importance alone.
pub fn search(
    conn: &Connection,
    embeddings: &EmbeddingCache,
    query: &str,
    filter: &SearchFilter,
    top_k: usize,
    config: &RetrievalConfig,
) -> Result<Vec<ScoredMemory>> {
    if top_k == 0 {
        return Ok(Vec::new());
    }

    // 1. Query embedding
    let query_embedding = if query.trim().is_empty() {
        None
    } else {
        match embeddings.get_or_compute(query) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding unavailable, ranking by keywords only");
                None
            }
        }
    };

    // 2. Bounded pre-filter
    let limit = top_k
        .saturating_mul(config.prefilter_multiplier)
        .min(config.prefilter_cap);
    let candidates = prefilter(conn, filter, limit)?;
    let candidate_count = candidates.len();

    // 3. Score
    let query_terms = tokenize(query);
    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|memory| {
            let semantic_score = match (&query_embedding, &memory.embedding) {
                (Some(q), Some(m)) => f64::from(cosine_similarity(q, m)).max(0.0),
                _ => 0.0,
            };
            let keyword_score = keyword_score(&query_terms, &memory.content);
            let score = hybrid_score(semantic_score, keyword_score, memory.importance, config);
            ScoredMemory {
                memory,
                score,
                semantic_score,
                keyword_score,
            }
        })
        .collect();

    // 4. Rank; the sort is stable so ties keep pre-filter order
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);

    // 5. Access tracking for the returned results only
    let now = now_timestamp();
    let returned_ids: Vec<&str> = scored.iter().map(|s| s.memory.id.as_str()).collect();
    update_access(conn, &returned_ids, &now)?;
    for hit in &mut scored {
        hit.memory.access_count += 1;
        hit.memory.last_accessed = Some(now.clone());
    }

    tracing::debug!(
        query_len = query.len(),
        candidates = candidate_count,
        returned = scored.len(),
        semantic = query_embedding.is_some(),
        "search complete"
    );
    Ok(scored)
}

/// Weighted blend of semantic and keyword scores, boosted by importance
/// (up to +50% at importance 10 with the default divisor).
pub fn hybrid_score(
    semantic_score: f64,
    keyword_score: f64,
    importance: u8,
    config: &RetrievalConfig,
) -> f64 {
    let base = config.semantic_weight * semantic_score + config.keyword_weight * keyword_score;
    base * (1.0 + f64::from(importance) / config.importance_divisor)
}

/// Fraction of distinct query terms that also appear as terms of `content`.
///
/// Recall-style: the length of `content` does not dilute the score.
pub fn keyword_score(query_terms: &BTreeSet<String>, content: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let content_terms: HashSet<String> = tokenize(content).into_iter().collect();
    let matched = query_terms
        .iter()
        .filter(|t| content_terms.contains(t.as_str()))
        .count();
    matched as f64 / query_terms.len() as f64
}

/// Lowercased whitespace tokens with surrounding punctuation trimmed.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Candidate rows ordered by importance then recency, capped at `limit`.
fn prefilter(conn: &Connection, filter: &SearchFilter, limit: usize) -> Result<Vec<Memory>> {
    let (sql, values) = prefilter_query(filter, limit);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// SQL and bound values for [`prefilter`].
fn prefilter_query(filter: &SearchFilter, limit: usize) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(section) = &filter.section {
        values.push(Value::Text(section.clone()));
        clauses.push(format!("section = ?{}", values.len()));
    }

    let tags: BTreeSet<&str> = filter
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    for tag in tags {
        values.push(Value::Text(tag.to_string()));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(memories.tags) WHERE json_each.value = ?{})",
            values.len()
        ));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    values.push(Value::Integer(limit as i64));
    let sql = format!(
        "SELECT {} FROM memories {where_clause} \
         ORDER BY importance DESC, created_at DESC, rowid DESC LIMIT ?{}",
        memory_columns(""),
        values.len()
    );
    (sql, values)
}

/// Batch update access_count and last_accessed for returned results.
fn update_access(conn: &Connection, ids: &[&str], now: &str) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    {
        let mut stmt = tx.prepare(
            "UPDATE memories SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
        )?;
        for id in ids {
            stmt.execute(params![now, id])?;
        }
    }
    tx.commit()?;
    Ok(())
}
