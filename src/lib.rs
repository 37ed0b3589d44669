//! Embedded associative memory store.
//!
//! recollect persists short text memories in a local SQLite database, embeds
//! each one through a pluggable [`EmbeddingProvider`](embedding::EmbeddingProvider),
//! and links semantically similar memories within the same section. Retrieval
//! blends embedding similarity, keyword overlap, and a per-memory importance
//! boost.
//!
//! | Concept | Meaning |
//! |---------|---------|
//! | **Memory** | A text record with section, tags, importance (1–10), metadata, and an embedding |
//! | **Section** | Named grouping; memories only auto-link inside their own section |
//! | **Link** | Directed `related_to` edge weighted by cosine similarity, capped per memory |
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL, `BEGIN IMMEDIATE` writers) with embeddings as f32 BLOBs
//! - **Embeddings**: [`EmbeddingProvider`](embedding::EmbeddingProvider) behind a shared LRU [`EmbeddingCache`](embedding::EmbeddingCache)
//! - **Linking**: bounded candidate window, similarity threshold, and fan-out cap
//! - **Search**: bounded pre-filter by importance and recency, then hybrid scoring in memory
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`embedding`]: Embedding provider trait, built-in hashing provider, and cache
//! - [`memory`]: Store, auto-linker, search, relations, maintenance, and stats
//! - [`engine`]: [`MemoryEngine`], the connection-owning facade over all of the above
//! - [`error`]: [`MemoryError`] and the crate [`Result`] alias

pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod memory;

pub use engine::MemoryEngine;
pub use error::{MemoryError, Result};
