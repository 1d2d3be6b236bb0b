//! Similarity search over the shared pedagogy corpus.

use shiksha_core::chunk::PedagogyChunk;
use shiksha_core::error::StoreError;
use shiksha_core::vector::VectorStore;
use std::sync::Arc;
use tracing::debug;

/// Retrieves teaching-approach excerpts from one shared collection.
pub struct PedagogyRetriever {
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl PedagogyRetriever {
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Query text tuned to the teacher's background.
    ///
    /// B.Ed-qualified teachers get subject depth and misconceptions; others
    /// get classroom strategies and activities.
    pub fn enhanced_query(question: &str, subject: &str, grade: &str, is_bed_qualified: bool) -> String {
        if is_bed_qualified {
            format!(
                "{question} {subject} grade {grade} deeper conceptual understanding, \
                 common student misconceptions, advanced subject knowledge"
            )
        } else {
            format!(
                "{question} how to teach {subject} to grade {grade} students, \
                 teaching strategies, classroom activities, step by step explanation"
            )
        }
    }

    /// Up to `top_k` chunks, closest first. A missing collection yields none.
    pub async fn retrieve(
        &self,
        question: &str,
        subject: &str,
        grade: &str,
        is_bed_qualified: bool,
        top_k: usize,
    ) -> Result<Vec<PedagogyChunk>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query = Self::enhanced_query(question, subject, grade, is_bed_qualified);
        let hits = match self
            .store
            .search_similar_chunks(&self.collection, &query, top_k)
            .await
        {
            Ok(hits) => hits,
            Err(StoreError::CollectionNotFound(_)) => {
                debug!(collection = %self.collection, "Pedagogy collection absent");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let chunks: Vec<PedagogyChunk> = hits
            .documents
            .iter()
            .zip(&hits.metadatas)
            .zip(&hits.distances)
            .enumerate()
            .map(|(i, ((doc, meta), distance))| {
                PedagogyChunk::from_stored(doc, meta, i, 1.0 - distance)
            })
            .take(top_k)
            .collect();

        debug!(
            collection = %self.collection,
            returned = chunks.len(),
            is_bed_qualified,
            "Pedagogy retrieval complete"
        );
        Ok(chunks)
    }
}
