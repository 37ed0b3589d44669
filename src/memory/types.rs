//! Core record and request types.
//!
//! Defines [`Memory`] (a stored fragment), [`Link`] (an inferred relationship),
//! [`Section`] (a partition of the store), the write/patch requests, and the
//! shapes returned by search and maintenance operations.

use std::collections::BTreeSet;

use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub content: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    /// Present once computed. Not serialized; vectors are an internal detail.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub tags: BTreeSet<String>,
    /// Always within `1..=10`.
    pub importance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
    /// Number of times this memory has been returned in search results.
    pub access_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
    /// Number of link rows this memory is an endpoint of.
    pub link_count: u32,
}

/// An inferred (or manually created) relationship between two memories.
///
/// Stored directed, but the relation is treated as undirected: both endpoints
/// count it in their `link_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relationship: String,
    /// Similarity at creation time, in `[0, 1]`.
    pub strength: f64,
    pub created_at: String,
}

/// A named partition of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub created_at: String,
}

/// Input to the write path.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub section: String,
    pub subsection: Option<String>,
    pub tags: Vec<String>,
    /// Validated to `1..=10` before anything is written.
    pub importance: i64,
    pub metadata: Option<serde_json::Value>,
    /// Run the auto-linker after the memory is stored.
    pub auto_link: bool,
}

impl NewMemory {
    pub fn new(content: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            section: section.into(),
            subsection: None,
            tags: Vec::new(),
            importance: 5,
            metadata: None,
            auto_link: true,
        }
    }

    pub fn subsection(mut self, subsection: impl Into<String>) -> Self {
        self.subsection = Some(subsection.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn importance(mut self, importance: i64) -> Self {
        self.importance = importance;
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn auto_link(mut self, auto_link: bool) -> Self {
        self.auto_link = auto_link;
        self
    }
}

/// Partial update. `None` leaves a field untouched; `updated_at` always moves.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    /// A new content forces the embedding to be recomputed.
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tags.is_none()
            && self.importance.is_none()
            && self.metadata.is_none()
    }
}

/// A search hit with its hybrid score and the components it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub score: f64,
    pub semantic_score: f64,
    pub keyword_score: f64,
}

/// A one-hop neighbour returned by a related-memory lookup.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub relationship: String,
    pub strength: f64,
}

/// Compact node representation for graph export.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    /// Content preview.
    pub label: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    pub tags: BTreeSet<String>,
    pub importance: u8,
    pub link_count: u32,
}

/// A section-scoped subgraph: nodes plus the links with both endpoints among them.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Link>,
}

/// Two memories whose embeddings exceed the duplicate threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatePair {
    pub first_id: String,
    pub second_id: String,
    pub similarity: f32,
}

/// How [`merge_duplicates`](crate::memory::maintenance::merge_duplicates)
/// resolves a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Delete the chronologically older memory of each pair.
    #[default]
    KeepNewer,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeepNewer => "keep_newer",
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep_newer" => Ok(Self::KeepNewer),
            _ => Err(format!("unknown merge strategy: {s}")),
        }
    }
}

/// Outcome of a merge pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeResult {
    /// IDs removed, in processing order.
    pub deleted: Vec<String>,
    /// Pairs skipped because a member no longer existed.
    pub skipped: usize,
}

// ── Row mapping ───────────────────────────────────────────────────────────────

const MEMORY_COLUMN_NAMES: [&str; 13] = [
    "id",
    "content",
    "section",
    "subsection",
    "embedding",
    "tags",
    "importance",
    "metadata",
    "created_at",
    "updated_at",
    "access_count",
    "last_accessed",
    "link_count",
];

/// Column list for [`memory_from_row`], each qualified with `alias` when non-empty.
pub(crate) fn memory_columns(alias: &str) -> String {
    MEMORY_COLUMN_NAMES
        .iter()
        .map(|c| {
            if alias.is_empty() {
                c.to_string()
            } else {
                format!("{alias}.{c}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a row selected with [`memory_columns`] (starting at column 0).
pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let embedding: Option<Vec<u8>> = row.get(4)?;
    let tags_json: String = row.get(5)?;
    let metadata_str: Option<String> = row.get(7)?;

    let tags: BTreeSet<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let metadata: Option<serde_json::Value> = metadata_str
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        section: row.get(2)?,
        subsection: row.get(3)?,
        embedding: embedding.map(|b| super::bytes_to_embedding(&b)),
        tags,
        importance: row.get(6)?,
        metadata,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        access_count: row.get(10)?,
        last_accessed: row.get(11)?,
        link_count: row.get(12)?,
    })
}

pub(crate) fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relationship: row.get(3)?,
        strength: row.get(4)?,
        created_at: row.get(5)?,
    })
}
