//! # Shiksha Core
//!
//! Domain types, traits, and error definitions for the Shiksha grounded
//! tutoring engine. This crate has **no I/O**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the tutor (LLM providers, vector index, curriculum
//! catalog) is defined as a trait here. Implementations live in their
//! respective crates, so the orchestrator can be exercised with stubs.

pub mod board;
pub mod chunk;
pub mod curriculum;
pub mod error;
pub mod message;
pub mod provider;
pub mod vector;

// Re-export key types at crate root for ergonomics
pub use board::{Board, MaterialLanguage};
pub use chunk::{ChunkMetadata, MaterialChunk, PedagogyChunk};
pub use curriculum::{ChapterContent, ChapterSummary, CurriculumStore, SyllabusOutline, SyllabusUnit};
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use vector::{ChunkRecord, CollectionDump, Embedder, SearchHits, VectorStore};
