//! SQLite vector store.
//!
//! Uses a single SQLite database file with two tables:
//! - `collections`: one row per collection, with the embedding model that filled it
//! - `chunks`: documents, JSON metadata, and little-endian `f32` embedding blobs
//!
//! Similarity search scans a collection's embeddings and ranks them in
//! process; collections are per uploaded material and stay small.

use crate::vector;
use async_trait::async_trait;
use chrono::Utc;
use shiksha_core::chunk::{ChunkMetadata, metadata_chunk_index};
use shiksha_core::error::StoreError;
use shiksha_core::vector::{ChunkRecord, CollectionDump, Embedder, SearchHits, VectorStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A persistent vector store on SQLite.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (or create) the database at `path`.
    pub async fn open(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool, embedder };
        store.run_migrations().await?;
        info!(path = %path.display(), model = %store.embedder.model(), "SQLite vector store initialized");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        let store = Self { pool, embedder };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name            TEXT PRIMARY KEY,
                embedding_model TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("collections table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                collection   TEXT NOT NULL REFERENCES collections(name),
                chunk_id     TEXT NOT NULL,
                document     TEXT NOT NULL,
                metadata     TEXT NOT NULL DEFAULT '{}',
                chunk_index  INTEGER,
                embedding    BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chunks table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection, chunk_index)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("collection index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_metadata(row: &sqlx::sqlite::SqliteRow) -> Result<ChunkMetadata, StoreError> {
        let raw: String = row
            .try_get("metadata")
            .map_err(|e| StoreError::QueryFailed(format!("metadata column: {e}")))?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }

    fn row_document(row: &sqlx::sqlite::SqliteRow) -> Result<String, StoreError> {
        row.try_get("document")
            .map_err(|e| StoreError::QueryFailed(format!("document column: {e}")))
    }

    async fn collection_model(&self, name: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT embedding_model FROM collections WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("collection lookup: {e}")))?;

        match row {
            Some(r) => Ok(Some(r.try_get("embedding_model").map_err(|e| {
                StoreError::QueryFailed(format!("embedding_model column: {e}"))
            })?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.collection_model(name).await?.is_some())
    }

    async fn insert(&self, name: &str, records: Vec<ChunkRecord>) -> Result<usize, StoreError> {
        let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query(
            "INSERT OR IGNORE INTO collections (name, embedding_model, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(name)
        .bind(self.embedder.model())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("collection INSERT failed: {e}")))?;

        let mut count = 0;
        for (record, embedding) in records.into_iter().zip(embeddings) {
            let chunk_id = record.id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let chunk_index = metadata_chunk_index(&record.metadata).map(|i| i as i64);
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|e| StoreError::Storage(format!("Metadata serialization: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO chunks (collection, chunk_id, document, metadata, chunk_index, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(name)
            .bind(&chunk_id)
            .bind(&record.content)
            .bind(&metadata)
            .bind(chunk_index)
            .bind(vector::embedding_to_blob(&embedding))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("chunk INSERT failed: {e}")))?;

            count += 1;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(collection = name, count, "Inserted chunks");
        Ok(count)
    }

    async fn search_similar_chunks(
        &self,
        name: &str,
        query: &str,
        n_results: usize,
    ) -> Result<SearchHits, StoreError> {
        let Some(model) = self.collection_model(name).await? else {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        };

        if model != self.embedder.model() {
            warn!(
                collection = name,
                stored = %model,
                active = %self.embedder.model(),
                "Collection was embedded with a different model; distances may be meaningless"
            );
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let rows = sqlx::query(
            "SELECT document, metadata, embedding FROM chunks WHERE collection = ?1 ORDER BY iid",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Vector scan: {e}")))?;

        let embeddings: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.try_get("embedding").unwrap_or_default();
                vector::blob_to_embedding(&blob)
            })
            .collect();

        let ranked = vector::nearest(
            &query_embedding,
            embeddings.iter().map(|e| e.as_slice()),
            n_results,
        );

        let mut hits = SearchHits::default();
        for (position, distance) in ranked {
            let row = &rows[position];
            hits.documents.push(Self::row_document(row)?);
            hits.metadatas.push(Self::row_metadata(row)?);
            hits.distances.push(distance);
        }
        Ok(hits)
    }

    async fn get_all_chunks(&self, name: &str) -> Result<CollectionDump, StoreError> {
        if !self.collection_exists(name).await? {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        let rows = sqlx::query(
            r#"
            SELECT document, metadata FROM chunks
            WHERE collection = ?1
            ORDER BY chunk_index IS NULL, chunk_index, iid
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Collection dump: {e}")))?;

        let mut dump = CollectionDump::default();
        for row in &rows {
            dump.documents.push(Self::row_document(row)?);
            dump.metadatas.push(Self::row_metadata(row)?);
        }
        Ok(dump)
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("List collections: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("name")
                    .map_err(|e| StoreError::QueryFailed(format!("name column: {e}")))
            })
            .collect()
    }
}
