//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, a deterministic feature-hashing
//! implementation, and the bounded [`EmbeddingCache`] that sits in front of
//! both the write path and the query path. Providers are created via
//! [`create_provider`] from configuration.

pub mod cache;
pub mod hash;

pub use cache::EmbeddingCache;
pub use hash::HashEmbeddingProvider;

use anyhow::Result;

/// Default vector width for the built-in provider.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations must be deterministic (identical text yields an identical
/// vector) and side-effect free, and always produce exactly
/// [`dimensions`](EmbeddingProvider::dimensions) components.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// Currently only `"hash"` is supported. Real text-embedding models plug in by
/// implementing [`EmbeddingProvider`] and handing the result to
/// [`EmbeddingCache::new`].
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => {
            let provider = HashEmbeddingProvider::new(config.dimensions)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hash"),
    }
}
