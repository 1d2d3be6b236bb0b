//! Vector store implementations for Shiksha.

pub mod embedding;
pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use embedding::{HashingEmbedder, ProviderEmbedder};
pub use in_memory::InMemoryVectorStore;
pub use vector::{cosine_distance, cosine_similarity};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteVectorStore;
