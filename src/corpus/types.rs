use serde::{Deserialize, Serialize};

/// Content-addressed passage ID (blake3 hex of source + text).
pub type PassageId = String;

/// One retrievable span of source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    /// e.g. "url:https://..." or "file:notes/cardiology.txt"
    pub source: String,
    /// Position of the passage within its source, from 0.
    pub ordinal: usize,
    pub text: String,
    pub ingested_at: i64,
}

/// Metadata for an ingested source, one entry per source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMeta {
    pub source: String,
    pub name: String,
    /// Topic label shown by `/medrag sources`
    pub label: String,
    pub passage_count: usize,
    /// Size of the ingested text in bytes.
    pub size: usize,
    pub ingested_at: i64,
}
