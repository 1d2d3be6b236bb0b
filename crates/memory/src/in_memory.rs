//! In-memory vector store: useful for testing and ephemeral deployments.

use crate::embedding::HashingEmbedder;
use crate::vector;
use async_trait::async_trait;
use shiksha_core::chunk::ChunkMetadata;
use shiksha_core::error::StoreError;
use shiksha_core::vector::{ChunkRecord, CollectionDump, Embedder, SearchHits, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredChunk {
    document: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

/// Collections held in a map guarded by an async `RwLock`.
///
/// Record ids are not kept; lookups are by collection only.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    collections: RwLock<HashMap<String, Vec<StoredChunk>>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Store backed by the offline [`HashingEmbedder`].
    pub fn with_hashing() -> Self {
        Self::new(Arc::new(HashingEmbedder::default()))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::with_hashing()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn insert(&self, name: &str, records: Vec<ChunkRecord>) -> Result<usize, StoreError> {
        let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let stored: Vec<StoredChunk> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| StoredChunk {
                document: record.content,
                metadata: record.metadata,
                embedding,
            })
            .collect();

        let count = stored.len();
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .extend(stored);

        debug!(collection = name, count, "Inserted chunks");
        Ok(count)
    }

    async fn search_similar_chunks(
        &self,
        name: &str,
        query: &str,
        n_results: usize,
    ) -> Result<SearchHits, StoreError> {
        if !self.collection_exists(name).await? {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let collections = self.collections.read().await;
        let chunks = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        let ranked = vector::nearest(
            &query_embedding,
            chunks.iter().map(|c| c.embedding.as_slice()),
            n_results,
        );

        let mut hits = SearchHits::default();
        for (position, distance) in ranked {
            let chunk = &chunks[position];
            hits.documents.push(chunk.document.clone());
            hits.metadatas.push(chunk.metadata.clone());
            hits.distances.push(distance);
        }
        Ok(hits)
    }

    async fn get_all_chunks(&self, name: &str) -> Result<CollectionDump, StoreError> {
        let collections = self.collections.read().await;
        let chunks = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        let mut ordered: Vec<(usize, &StoredChunk)> = chunks.iter().enumerate().collect();
        ordered.sort_by_key(|(position, chunk)| vector::dump_order_key(&chunk.metadata, *position));

        let mut dump = CollectionDump::default();
        for (_, chunk) in ordered {
            dump.documents.push(chunk.document.clone());
            dump.metadatas.push(chunk.metadata.clone());
        }
        Ok(dump)
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
