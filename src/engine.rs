//! The public API surface: one [`MemoryEngine`] per database connection.
//!
//! The engine owns its SQLite connection and shares an injected
//! [`EmbeddingCache`]; several engines (for example one per thread, each on
//! its own connection to the same file) can share a single cache. SQLite's
//! own locking is the only concurrency control between them.

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;

use crate::config::RecollectConfig;
use crate::db;
use crate::embedding::{self, EmbeddingCache};
use crate::error::{MemoryError, Result};
use crate::memory::search::SearchFilter;
use crate::memory::stats::StatsResponse;
use crate::memory::types::{
    DuplicatePair, Graph, Memory, MemoryPatch, MergeResult, MergeStrategy, NewMemory,
    RelatedMemory, ScoredMemory, Section,
};
use crate::memory::{linker, maintenance, relations, search, stats, store};

pub struct MemoryEngine {
    conn: Connection,
    embeddings: Arc<EmbeddingCache>,
    config: RecollectConfig,
}

impl MemoryEngine {
    /// Wrap an initialized connection.
    ///
    /// Records the cache's embedding dimensionality on first use and refuses
    /// a store that was created with a different one.
    pub fn new(
        conn: Connection,
        embeddings: Arc<EmbeddingCache>,
        config: RecollectConfig,
    ) -> Result<Self> {
        let configured = embeddings.dimensions();
        // Write-once insert, then compare against whichever opener won.
        db::migrations::set_embedding_dimensions(&conn, configured)?;
        let stored = db::migrations::get_embedding_dimensions(&conn)?;
        if stored != Some(configured) {
            return Err(MemoryError::DimensionMismatch {
                stored: stored.unwrap_or(0),
                configured,
            });
        }

        Ok(Self {
            conn,
            embeddings,
            config,
        })
    }

    /// Open the configured database with the configured provider and a fresh cache.
    pub fn open(config: RecollectConfig) -> anyhow::Result<Self> {
        let provider = embedding::create_provider(&config.embedding)?;
        let cache = Arc::new(EmbeddingCache::new(
            Arc::from(provider),
            config.embedding.cache_size,
        ));
        let path = config.resolved_db_path();
        Self::open_at(path, cache, config)
    }

    /// Open (or create) a database file, sharing `embeddings`.
    pub fn open_at(
        path: impl AsRef<Path>,
        embeddings: Arc<EmbeddingCache>,
        config: RecollectConfig,
    ) -> anyhow::Result<Self> {
        let conn = db::open_database(path)?;
        Ok(Self::new(conn, embeddings, config)?)
    }

    /// A private in-memory store.
    pub fn in_memory(embeddings: Arc<EmbeddingCache>, config: RecollectConfig) -> anyhow::Result<Self> {
        let conn = db::open_memory_database()?;
        Ok(Self::new(conn, embeddings, config)?)
    }

    // ── Write path ────────────────────────────────────────────────────────────

    /// Store a memory and, unless disabled, link it. Returns the new id.
    pub fn add(&mut self, new: &NewMemory) -> Result<String> {
        store::add_memory(&mut self.conn, &self.embeddings, new, &self.config.linking)
    }

    pub fn update(&mut self, memory_id: &str, patch: &MemoryPatch) -> Result<()> {
        store::update_memory(&mut self.conn, &self.embeddings, memory_id, patch)
    }

    /// Delete a memory and its links. Returns the number of links removed.
    pub fn delete(&mut self, memory_id: &str) -> Result<usize> {
        store::delete_memory(&mut self.conn, memory_id)
    }

    /// Re-run the auto-linker for an existing memory.
    pub fn link(&mut self, memory_id: &str) -> Result<usize> {
        linker::auto_link(&mut self.conn, memory_id, &self.config.linking)
    }

    pub fn ensure_section(
        &self,
        name: &str,
        description: Option<&str>,
        parent: Option<&str>,
    ) -> Result<bool> {
        store::ensure_section(&self.conn, name, description, parent)
    }

    // ── Read path ─────────────────────────────────────────────────────────────

    pub fn get(&self, memory_id: &str) -> Result<Memory> {
        store::get_memory(&self.conn, memory_id)
    }

    /// Ranked search; `top_k` defaults to `retrieval.default_top_k`.
    pub fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredMemory>> {
        let top_k = top_k.unwrap_or(self.config.retrieval.default_top_k);
        search::search(
            &self.conn,
            &self.embeddings,
            query,
            filter,
            top_k,
            &self.config.retrieval,
        )
    }

    pub fn get_related(&self, memory_id: &str) -> Result<Vec<RelatedMemory>> {
        relations::get_related(&self.conn, memory_id, self.config.maintenance.related_limit)
    }

    pub fn get_graph(&self, section: Option<&str>) -> Result<Graph> {
        relations::get_graph(&self.conn, section)
    }

    pub fn list_sections(&self) -> Result<Vec<Section>> {
        store::list_sections(&self.conn)
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    /// Duplicate pairs above `threshold` (default `maintenance.duplicate_threshold`).
    pub fn find_duplicates(&self, threshold: Option<f32>) -> Result<Vec<DuplicatePair>> {
        let threshold = threshold.unwrap_or(self.config.maintenance.duplicate_threshold);
        maintenance::find_duplicates(
            &self.conn,
            threshold,
            self.config.maintenance.duplicate_scan_limit,
        )
    }

    pub fn merge_duplicates(
        &mut self,
        pairs: &[DuplicatePair],
        strategy: MergeStrategy,
    ) -> Result<MergeResult> {
        maintenance::merge_duplicates(&mut self.conn, pairs, strategy)
    }

    pub fn get_stats(&self, section: Option<&str>) -> Result<StatsResponse> {
        stats::memory_stats(&self.conn, section)
    }

    pub fn repair_link_counts(&self) -> Result<usize> {
        linker::repair_link_counts(&self.conn)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingCache> {
        &self.embeddings
    }

    pub fn config(&self) -> &RecollectConfig {
        &self.config
    }
}
