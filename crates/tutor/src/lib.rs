//! The grounded tutoring pipeline.
//!
//! A session is grounded on exactly one source: an uploaded material's
//! chunks, a matched textbook chapter, or a syllabus outline. Every prompt
//! carries that source inside a delimited block and instructs the model to
//! answer from it alone.
//!
//! 1. **Retrieve** the source (`material`, `pedagogy`, curriculum lookups)
//! 2. **Format** the overview or follow-up prompt (`formatter`, `relevance`)
//! 3. **Dispatch** through the primary/fallback [`LlmDispatcher`](shiksha_providers::LlmDispatcher)
//! 4. **Commit** the turn to the [`SessionStore`]

pub mod chapter_match;
pub mod formatter;
pub mod language;
pub mod material;
pub mod orchestrator;
pub mod pedagogy;
pub mod relevance;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chapter_match::{ChapterMatch, best_chapter, match_score};
pub use formatter::{GROUNDING_CLAUSE, format_comprehensive_overview, format_followup_prompt};
pub use language::detect_language;
pub use material::{MaterialRetrieval, MaterialRetriever, SourceDescriptor, collection_name};
pub use orchestrator::{
    ChatRequest, ChatResponse, StartSessionRequest, StartSessionResponse, TutorOrchestrator,
};
pub use pedagogy::PedagogyRetriever;
pub use relevance::{extract_text_window, select_relevant_chunks};
pub use session::{SessionStore, SourceType, TutoringSession};
