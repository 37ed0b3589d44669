//! Bounded text → vector cache in front of an [`EmbeddingProvider`].
//!
//! Eviction is least-recently-used: a hit refreshes the entry, so embeddings
//! for hot queries survive a stream of one-off writes. The lock is held across
//! a miss so each text is embedded at most once while it stays cached.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use super::EmbeddingProvider;
use crate::error::{MemoryError, Result};

pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    entries: Mutex<LruCache<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// Wrap `provider` with a cache holding at most `capacity` entries
    /// (a capacity of 0 is treated as 1).
    pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached vector for `text`, computing and inserting it on a miss.
    pub fn get_or_compute(&self, text: &str) -> Result<Vec<f32>> {
        let mut entries = self.lock();

        if let Some(hit) = entries.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let vector = self
            .provider
            .embed(text)
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let expected = self.provider.dimensions();
        if vector.len() != expected {
            return Err(MemoryError::Embedding(format!(
                "provider returned {} dimensions, expected {expected}",
                vector.len()
            )));
        }

        if let Some((evicted, _)) = entries.push(text.to_string(), vector.clone()) {
            tracing::trace!(evicted_len = evicted.len(), "embedding cache eviction");
        }
        Ok(vector)
    }

    /// Dimensionality of every vector this cache hands out.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lock().contains(text)
    }

    /// `(hits, misses)` since construction.
    pub fn counters(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        // A panic mid-insert leaves the map itself intact, so keep using it.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (hits, misses) = self.counters();
        f.debug_struct("EmbeddingCache")
            .field("dimensions", &self.dimensions())
            .field("len", &self.len())
            .field("hits", &hits)
            .field("misses", &misses)
            .finish()
    }
}
