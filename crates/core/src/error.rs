//! Error types for the Shiksha domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Shiksha operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Vector store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Curriculum catalog errors ---
    #[error("Curriculum error: {0}")]
    Curriculum(#[from] CurriculumError),

    // --- Tutoring errors ---
    #[error("Tutor error: {0}")]
    Tutor(#[from] TutorError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
}

#[derive(Debug, Clone, Error)]
pub enum CurriculumError {
    #[error("Curriculum catalog not configured: {0}")]
    NotConfigured(String),

    #[error("Curriculum catalog error: {0}")]
    Catalog(String),
}

/// Errors visible to callers of the tutoring entry points.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Session not found: {0}")]
    SessionNotFound(u64),

    #[error("Tutor not configured: {0}")]
    NotConfigured(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Curriculum error: {0}")]
    Curriculum(#[from] CurriculumError),
}
