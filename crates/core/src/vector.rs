//! Vector store trait: per-collection embedding index.
//!
//! The store hides the embedding model: callers insert and query text,
//! the backend embeds through its [`Embedder`].

use crate::chunk::ChunkMetadata;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A document to be inserted into a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Stable identifier; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The text that gets embedded and returned as `documents`
    pub content: String,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata,
        }
    }
}

/// Similarity search results, parallel vectors sorted by ascending distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    /// In `[0, 1]`; smaller = closer
    pub distances: Vec<f32>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Every chunk of a collection in stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDump {
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
}

impl CollectionDump {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, recorded alongside stored vectors.
    fn model(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError>;
}

/// The core VectorStore trait.
///
/// Implementations: SQLite (persistent), in-memory (tests, ephemeral).
/// Implementations must be safe to share across concurrent sessions.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Embed and append records, creating the collection if needed.
    /// Returns the number of records inserted.
    async fn insert(&self, name: &str, records: Vec<ChunkRecord>) -> Result<usize, StoreError>;

    /// Nearest neighbours of `query`. A missing collection yields
    /// `StoreError::CollectionNotFound`.
    async fn search_similar_chunks(
        &self,
        name: &str,
        query: &str,
        n_results: usize,
    ) -> Result<SearchHits, StoreError>;

    /// All chunks, ordered by `chunk_index` metadata when present, then insertion order.
    async fn get_all_chunks(&self, name: &str) -> Result<CollectionDump, StoreError>;

    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;
}
