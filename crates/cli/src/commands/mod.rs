pub mod chapters;
pub mod doctor;
pub mod index;
pub mod onboard;
pub mod tutor;

use shiksha_config::AppConfig;
use shiksha_core::vector::{Embedder, VectorStore};
use shiksha_curriculum::JsonCatalog;
use shiksha_memory::{HashingEmbedder, InMemoryVectorStore, ProviderEmbedder, SqliteVectorStore};
use std::sync::Arc;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// `hashing` embeds offline; any other model goes to the fallback endpoint.
pub fn build_embedder(config: &AppConfig) -> CliResult<Arc<dyn Embedder>> {
    let model = config.vector_store.embedding_model.trim();
    if model == "hashing" {
        return Ok(Arc::new(HashingEmbedder::default()));
    }

    let provider = shiksha_providers::build_fallback(&config.fallback).ok_or_else(|| {
        format!("Embedding model '{model}' needs a fallback provider key (FALLBACK_PROVIDER_KEY)")
    })?;
    Ok(Arc::new(ProviderEmbedder::new(provider, model)))
}

pub async fn open_vector_store(config: &AppConfig) -> CliResult<Arc<dyn VectorStore>> {
    let embedder = build_embedder(config)?;
    match config.vector_store.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryVectorStore::new(embedder))),
        _ => {
            let path = config.vector_store.resolved_path();
            let store = SqliteVectorStore::open(&path, embedder)
                .await
                .map_err(|e| format!("Failed to open vector store at {}: {e}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

pub fn open_catalog(config: &AppConfig) -> CliResult<JsonCatalog> {
    let path = config.curriculum.resolved_path();
    Ok(JsonCatalog::load(&path)?)
}
