#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use recollect::config::RecollectConfig;
use recollect::db;
use recollect::embedding::{EmbeddingCache, EmbeddingProvider};
use recollect::memory::types::NewMemory;
use recollect::MemoryEngine;
use rusqlite::{params, Connection};

/// Vector width used by every test provider.
pub const DIMS: usize = 32;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Unit vector along dimension `i`.
pub fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[i % DIMS] = 1.0;
    v
}

/// Unit vector whose cosine similarity to `axis(0)` is `similarity`, leaning
/// towards dimension `i`. Two such vectors with different `i` have similarity
/// `similarity²` to each other.
pub fn toward(i: usize, similarity: f32) -> Vec<f32> {
    assert!(i > 0 && i < DIMS);
    let mut v = vec![0.0f32; DIMS];
    v[0] = similarity;
    v[i] = (1.0 - similarity * similarity).sqrt();
    v
}

/// Provider that returns pre-registered vectors and counts every call.
/// Unregistered text is an error.
#[derive(Default)]
pub struct ScriptedProvider {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, text: &str, vector: Vec<f32>) {
        self.vectors.lock().unwrap().insert(text.to_string(), vector);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no vector scripted for {text:?}"))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

pub fn test_cache(provider: &Arc<ScriptedProvider>) -> Arc<EmbeddingCache> {
    let provider: Arc<dyn EmbeddingProvider> = provider.clone();
    Arc::new(EmbeddingCache::new(provider, 1000))
}

/// In-memory engine with default configuration over `provider`.
pub fn test_engine(provider: &Arc<ScriptedProvider>) -> MemoryEngine {
    MemoryEngine::in_memory(test_cache(provider), RecollectConfig::default()).unwrap()
}

/// Script `vector` for `content` and store it in `section`. Returns the id.
pub fn add_with_vector(
    engine: &mut MemoryEngine,
    provider: &ScriptedProvider,
    content: &str,
    section: &str,
    vector: Vec<f32>,
) -> String {
    provider.script(content, vector);
    engine.add(&NewMemory::new(content, section)).unwrap()
}

/// Number of link rows with `memory_id` as an endpoint.
pub fn link_rows(conn: &Connection, memory_id: &str) -> u32 {
    conn.query_row(
        "SELECT COUNT(*) FROM links WHERE source_id = ?1 OR target_id = ?1",
        params![memory_id],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn link_count(conn: &Connection, memory_id: &str) -> u32 {
    conn.query_row(
        "SELECT link_count FROM memories WHERE id = ?1",
        params![memory_id],
        |row| row.get(0),
    )
    .unwrap()
}

/// Check the stored link bookkeeping against the link rows for every memory,
/// and every link against the threshold and section rules.
pub fn assert_link_invariants(conn: &Connection, max_links: u32, threshold: f64) {
    let ids: Vec<String> = conn
        .prepare("SELECT id FROM memories")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    for id in &ids {
        let stored = link_count(conn, id);
        assert!(stored <= max_links, "{id} has {stored} links");
        assert_eq!(stored, link_rows(conn, id), "link_count drift on {id}");
    }

    let bad: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM links l \
             JOIN memories s ON s.id = l.source_id \
             JOIN memories t ON t.id = l.target_id \
             WHERE l.strength <= ?1 OR s.section != t.section",
            params![threshold],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(bad, 0, "links below threshold or across sections");
}
