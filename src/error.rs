//! Error taxonomy for the memory engine.
//!
//! Validation and lookup failures are surfaced as distinct variants so callers
//! can tell a bad request from a persistence failure. Everything coming out of
//! SQLite is wrapped in [`MemoryError::Store`] and never retried here.

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// A caller-supplied field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// No memory with this id exists.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// Persistence-engine failure (I/O, constraint violation, ...).
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The embedding provider failed to produce a vector.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The store was created with a different embedding dimensionality.
    #[error("embedding dimension mismatch: store has {stored}, provider produces {configured}")]
    DimensionMismatch { stored: usize, configured: usize },

    /// Tags or metadata could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
