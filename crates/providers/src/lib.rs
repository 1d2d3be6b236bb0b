//! LLM provider implementations for Shiksha.
//!
//! All providers implement the `shiksha_core::Provider` trait. The
//! dispatcher wires a stateful primary and a stateless fallback together.

pub mod builder;
pub mod chatflow;
pub mod dispatcher;
pub mod openai_compat;

pub use builder::{build_dispatcher, build_fallback, build_primary};
pub use chatflow::ChatflowProvider;
pub use dispatcher::{
    APOLOGY_SENTINEL, DispatchEntry, DispatchOutcome, DispatcherHealth, ERROR_LABEL, Generation,
    LlmDispatcher,
};
pub use openai_compat::OpenAiCompatProvider;
