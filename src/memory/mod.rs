pub mod linker;
pub mod maintenance;
pub mod relations;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

/// Most links a single memory may take part in (fan-out cap).
pub const MAX_LINKS_PER_MEMORY: u32 = 20;
/// Size of the recency-ordered candidate window scanned by the auto-linker.
pub const LINK_BATCH_SIZE: usize = 100;
/// Similarity a candidate must strictly exceed to be linked.
pub const LINK_SIMILARITY_THRESHOLD: f32 = 0.75;
/// Capacity of the embedding cache.
pub const EMBEDDING_CACHE_SIZE: usize = 1000;
/// Hard cap on rows scored by a single search.
pub const PREFILTER_CAP: usize = 1000;
/// Default similarity above which two memories count as duplicates.
pub const DUPLICATE_THRESHOLD: f32 = 0.95;
/// Memories considered by one duplicate scan.
pub const DUPLICATE_SCAN_LIMIT: usize = 1000;
/// Maximum results from a related-memory lookup.
pub const RELATED_LIMIT: usize = 20;

/// Relationship label written by the auto-linker.
pub const RELATED_TO: &str = "related_to";

/// Encode an embedding as little-endian f32 bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`embedding_to_bytes`]. Trailing partial chunks are ignored.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two vectors; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Current UTC time, fixed-width so lexical order matches chronological order.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Truncate content to max_chars, appending "..." if truncated.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((end, _)) => format!("{}...", &content[..end]),
    }
}
