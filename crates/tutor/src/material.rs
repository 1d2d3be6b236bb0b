//! Retrieval over a teacher-uploaded material's own collection.
//!
//! Every failure here degrades to "no material": the orchestrator then
//! falls back to the curriculum-outline path.

use crate::language::detect_language;
use serde::Serialize;
use shiksha_core::board::MaterialLanguage;
use shiksha_core::chunk::{ChunkMetadata, MaterialChunk, metadata_filename};
use shiksha_core::error::StoreError;
use shiksha_core::vector::VectorStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default similarity-search depth.
pub const DEFAULT_N_RESULTS: usize = 10;

/// Collection holding the chunks of one uploaded material.
pub fn collection_name(material_id: u64) -> String {
    format!("material_{material_id}")
}

/// Where the retrieved chunks came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub filename: String,
    pub chunks_retrieved: usize,
    /// Sorted, deduplicated
    pub pages: Vec<u32>,
}

/// Chunks of one material with their provenance and detected language.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRetrieval {
    pub chunks: Vec<MaterialChunk>,
    pub source: Option<SourceDescriptor>,
    pub language: MaterialLanguage,
}

impl MaterialRetrieval {
    fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            source: None,
            language: MaterialLanguage::English,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

pub struct MaterialRetriever {
    store: Arc<dyn VectorStore>,
    n_results: usize,
}

impl MaterialRetriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            n_results: DEFAULT_N_RESULTS,
        }
    }

    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = n_results;
        self
    }

    /// Load a material's chunks: the whole collection in stored order when
    /// `load_all`, otherwise the nearest chunks to `topic`.
    ///
    /// Never fails. An absent or unreadable collection yields no chunks,
    /// no source and `English`.
    pub async fn retrieve(&self, material_id: u64, topic: &str, load_all: bool) -> MaterialRetrieval {
        let collection = collection_name(material_id);

        let loaded = if load_all {
            self.load_all(&collection).await
        } else {
            self.search(&collection, topic).await
        };

        let (chunks, fallback_name) = match loaded {
            Ok(found) => found,
            Err(StoreError::CollectionNotFound(_)) => {
                debug!(collection = %collection, "Material collection absent");
                return MaterialRetrieval::empty();
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "Material retrieval failed");
                return MaterialRetrieval::empty();
            }
        };

        if chunks.is_empty() {
            debug!(collection = %collection, "Material collection is empty");
            return MaterialRetrieval::empty();
        }

        let language = detect_language(chunks.iter().map(|c| c.content.as_str()));
        let mut pages: Vec<u32> = chunks.iter().filter_map(|c| c.page_number).collect();
        pages.sort_unstable();
        pages.dedup();

        let source = SourceDescriptor {
            filename: fallback_name.unwrap_or_else(|| collection.clone()),
            chunks_retrieved: chunks.len(),
            pages,
        };

        debug!(
            collection = %collection,
            chunks = chunks.len(),
            language = %language,
            load_all,
            "Material retrieved"
        );

        MaterialRetrieval {
            chunks,
            source: Some(source),
            language,
        }
    }

    async fn load_all(
        &self,
        collection: &str,
    ) -> Result<(Vec<MaterialChunk>, Option<String>), StoreError> {
        let dump = self.store.get_all_chunks(collection).await?;
        let chunks = dump
            .documents
            .iter()
            .zip(&dump.metadatas)
            .enumerate()
            .map(|(i, (doc, meta))| MaterialChunk::from_stored(doc, meta, i, 1.0))
            .collect();
        Ok((chunks, first_filename(&dump.metadatas)))
    }

    async fn search(
        &self,
        collection: &str,
        topic: &str,
    ) -> Result<(Vec<MaterialChunk>, Option<String>), StoreError> {
        let hits = self
            .store
            .search_similar_chunks(collection, topic, self.n_results)
            .await?;
        let chunks = hits
            .documents
            .iter()
            .zip(&hits.metadatas)
            .zip(&hits.distances)
            .enumerate()
            .map(|(i, ((doc, meta), distance))| MaterialChunk::from_stored(doc, meta, i, 1.0 - distance))
            .collect();
        Ok((chunks, first_filename(&hits.metadatas)))
    }
}

fn first_filename(metadatas: &[ChunkMetadata]) -> Option<String> {
    metadatas.iter().find_map(metadata_filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shiksha_core::vector::ChunkRecord;
    use shiksha_memory::InMemoryVectorStore;

    fn record(content: &str, page: u32, index: usize) -> ChunkRecord {
        let meta = json!({"page_number": page, "chunk_index": index, "filename": "real_numbers.pdf"});
        ChunkRecord::new(content, meta.as_object().cloned().unwrap())
    }

    async fn store_with(collection: &str, records: Vec<ChunkRecord>) -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::with_hashing());
        store.insert(collection, records).await.unwrap();
        store
    }

    #[test]
    fn collection_naming() {
        assert_eq!(collection_name(42), "material_42");
    }

    #[tokio::test]
    async fn full_dump_keeps_order_and_dedupes_pages() {
        let store = store_with(
            "material_42",
            vec![
                record("Euclid's lemma", 3, 2),
                record("Introduction", 1, 0),
                record("Prime factorisation", 1, 1),
            ],
        )
        .await;

        let retrieval = MaterialRetriever::new(store).retrieve(42, "Real Numbers", true).await;
        let order: Vec<&str> = retrieval.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(order, vec!["Introduction", "Prime factorisation", "Euclid's lemma"]);
        assert!(retrieval.chunks.iter().all(|c| (c.relevance - 1.0).abs() < f32::EPSILON));

        let source = retrieval.source.unwrap();
        assert_eq!(source.filename, "real_numbers.pdf");
        assert_eq!(source.chunks_retrieved, 3);
        assert_eq!(source.pages, vec![1, 3]);
        assert_eq!(retrieval.language, MaterialLanguage::English);
    }

    #[tokio::test]
    async fn similarity_search_limits_results() {
        let records = (0..15).map(|i| record(&format!("chunk about primes {i}"), i, i as usize)).collect();
        let store = store_with("material_7", records).await;

        let retrieval = MaterialRetriever::new(store).retrieve(7, "primes", false).await;
        assert_eq!(retrieval.chunks.len(), DEFAULT_N_RESULTS);
        assert!(retrieval.chunks.iter().all(|c| (0.0..=1.0).contains(&c.relevance)));
    }

    #[tokio::test]
    async fn missing_collection_never_fails() {
        let store = Arc::new(InMemoryVectorStore::with_hashing());
        let retrieval = MaterialRetriever::new(store).retrieve(99, "anything", true).await;
        assert!(retrieval.is_empty());
        assert!(retrieval.source.is_none());
        assert_eq!(retrieval.language, MaterialLanguage::English);
    }

    #[tokio::test]
    async fn empty_collection_is_treated_as_missing() {
        let store = store_with("material_5", Vec::new()).await;
        let retrieval = MaterialRetriever::new(store).retrieve(5, "anything", true).await;
        assert!(retrieval.is_empty());
        assert!(retrieval.source.is_none());
    }

    #[tokio::test]
    async fn detects_hindi_material() {
        let store = store_with(
            "material_8",
            vec![
                record("वास्तविक संख्याएँ और उनके गुण", 1, 0),
                record("यूक्लिड विभाजन प्रमेयिका", 2, 1),
            ],
        )
        .await;
        let retrieval = MaterialRetriever::new(store).retrieve(8, "संख्याएँ", true).await;
        assert_eq!(retrieval.language, MaterialLanguage::Hindi);
    }

    #[tokio::test]
    async fn filename_defaults_to_collection() {
        let store = store_with(
            "material_3",
            vec![ChunkRecord::new("text", serde_json::Map::new())],
        )
        .await;
        let retrieval = MaterialRetriever::new(store).retrieve(3, "text", true).await;
        assert_eq!(retrieval.source.unwrap().filename, "material_3");
    }
}
