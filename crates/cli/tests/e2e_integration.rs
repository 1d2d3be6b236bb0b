//! End-to-end integration tests for the Shiksha tutoring engine.
//!
//! These tests drive the public orchestrator API over an in-memory vector
//! store, a JSON curriculum catalog and scripted LLM providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;
use shiksha_core::board::{Board, MaterialLanguage};
use shiksha_core::curriculum::CurriculumStore;
use shiksha_core::error::{ProviderError, TutorError};
use shiksha_core::message::{Message, Role};
use shiksha_core::provider::{Provider, ProviderRequest, ProviderResponse};
use shiksha_core::vector::{ChunkRecord, VectorStore};
use shiksha_curriculum::JsonCatalog;
use shiksha_memory::InMemoryVectorStore;
use shiksha_providers::{APOLOGY_SENTINEL, DispatchEntry, ERROR_LABEL, LlmDispatcher};
use shiksha_tutor::{
    ChatRequest, GROUNDING_CLAUSE, SourceType, StartSessionRequest, TutorOrchestrator,
    best_chapter, extract_text_window,
};

// ── Mock Providers ───────────────────────────────────────────────────────

/// Answers with fixed text, records prompts, and can be switched to failing.
struct ScriptedProvider {
    reply: String,
    handle: Option<String>,
    failing: AtomicBool,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            handle: None,
            failing: AtomicBool::new(false),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn with_handle(mut self, handle: &str) -> Self {
        self.handle = Some(handle.into());
        self
    }

    fn failing() -> Self {
        let provider = Self::new("");
        provider.set_failing(true);
        provider
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.prompts
            .lock()
            .unwrap()
            .push(request.messages[0].content.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("connection refused".into()));
        }

        Ok(ProviderResponse {
            message: Message::assistant(self.reply.clone()),
            usage: None,
            model: String::new(),
            conversation_handle: self.handle.clone(),
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const REAL_NUMBERS: &str = "Real numbers include rationals and irrationals.\n\
Euclid's Division Lemma: for positive integers a and b there exist q and r with a = bq + r, 0 <= r < b.\n\
The Fundamental Theorem of Arithmetic states every composite factorises uniquely into primes.";

fn long_chapter() -> String {
    let mut lines: Vec<String> = (0..600)
        .map(|i| format!("Paragraph {i}: decimal expansions of rational numbers terminate or repeat."))
        .collect();
    lines[300] = "Euclid's Division Lemma: given positive integers a and b, a = bq + r with 0 <= r < b.".into();
    lines.join("\n")
}

fn catalog(real_numbers: &str) -> Arc<JsonCatalog> {
    let json = json!({
        "textbooks": [{
            "grade": "10", "subject": "Mathematics",
            "chapters": [
                {"chapter_number": 1, "chapter_name": "Real Numbers", "cleaned_content": real_numbers,
                 "key_concepts": ["HCF", "LCM"]},
                {"chapter_number": 2, "chapter_name": "Polynomials", "cleaned_content": "Zeroes of a polynomial."}
            ]
        }]
    });
    Arc::new(JsonCatalog::from_json(&json.to_string()).unwrap())
}

fn meta(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap()
}

async fn vector_store() -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::with_hashing());

    let material: Vec<ChunkRecord> = (0..75)
        .map(|i| {
            ChunkRecord::new(
                format!("Teacher notes part {i}: HCF by repeated division"),
                meta(json!({"page_number": i / 5 + 1, "chunk_index": i, "filename": "real_numbers_notes.pdf"})),
            )
        })
        .collect();
    store.insert("material_42", material).await.unwrap();

    let hindi = vec![
        ChunkRecord::new("वास्तविक संख्याएँ और उनके गुण", meta(json!({"page_number": 1, "chunk_index": 0}))),
        ChunkRecord::new("यूक्लिड विभाजन प्रमेयिका", meta(json!({"page_number": 2, "chunk_index": 1}))),
        ChunkRecord::new("अभाज्य गुणनखंड Chapter 1", meta(json!({"page_number": 3, "chunk_index": 2}))),
    ];
    store.insert("material_77", hindi).await.unwrap();

    let pedagogy = vec![ChunkRecord::new(
        "Inquiry activity: let students discover real numbers on a number line",
        meta(json!({"module": "Module 4", "file_name": "pedagogy.pdf"})),
    )];
    store.insert("pedagogy", pedagogy).await.unwrap();

    store
}

fn dispatcher(primary: Arc<ScriptedProvider>, fallback: Arc<ScriptedProvider>) -> Arc<LlmDispatcher> {
    let timeout = Duration::from_secs(5);
    Arc::new(
        LlmDispatcher::new(
            Some(DispatchEntry::new(primary, "tutor-chatflow", timeout)),
            Some(DispatchEntry::new(fallback, "gpt-4o-mini", timeout)),
        )
        .unwrap(),
    )
}

async fn tutor_with(
    primary: Arc<ScriptedProvider>,
    fallback: Arc<ScriptedProvider>,
    chapter: &str,
) -> TutorOrchestrator {
    TutorOrchestrator::new(dispatcher(primary, fallback))
        .with_curriculum(catalog(chapter))
        .with_vector_store(vector_store().await, "pedagogy")
}

fn start(session_id: u64, topic: &str) -> StartSessionRequest {
    StartSessionRequest {
        session_id,
        teacher_id: 501,
        topic_name: topic.into(),
        subject: "Mathematics".into(),
        grade: "10".into(),
        state: "Delhi".into(),
        board: Board::Cbse,
        is_bed_qualified: true,
        material_id: None,
        material_filename: None,
    }
}

fn chat(session_id: u64, message: &str) -> ChatRequest {
    ChatRequest {
        session_id,
        user_message: message.into(),
        subject: "Mathematics".into(),
        grade: "10".into(),
        is_bed_qualified: true,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_exact_chapter_match_cbse() {
    let primary = Arc::new(ScriptedProvider::new("Let us explore real numbers.").with_handle("conv-1"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary.clone(), fallback.clone(), REAL_NUMBERS).await;

    let chapters = catalog(REAL_NUMBERS)
        .get_available_chapters("10", "Mathematics")
        .await
        .unwrap();
    let matched = best_chapter("Real Numbers", &chapters).unwrap();
    assert_eq!(matched.chapter.chapter_name, "Real Numbers");
    assert_eq!(matched.score, 100);

    let response = tutor.start_session(start(1, "Real Numbers")).await;
    assert_eq!(response.source_type, SourceType::Curriculum);
    assert!(!response.initial_message.is_empty());
    assert_eq!(response.model_used, "Primary(tutor-chatflow)");

    let prompt = primary.last_prompt();
    assert!(prompt.contains(REAL_NUMBERS));
    assert!(prompt.contains(GROUNDING_CLAUSE));

    let session = tutor.session(1).await.unwrap();
    assert_eq!(session.textbook_content, REAL_NUMBERS);
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].role, Role::Assistant);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn e2e_uploaded_material_overrides_curriculum() {
    let primary = Arc::new(ScriptedProvider::new("Your notes cover HCF."));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary.clone(), fallback, REAL_NUMBERS).await;

    let mut request = start(2, "Real Numbers");
    request.material_id = Some(42);
    let response = tutor.start_session(request).await;

    assert_eq!(response.source_type, SourceType::UploadedMaterial);
    assert_eq!(response.material_filename.as_deref(), Some("real_numbers_notes.pdf"));

    let prompt = primary.last_prompt();
    assert!(prompt.contains("Teacher notes part 0:"));
    assert!(!prompt.contains(REAL_NUMBERS));
    assert!(!prompt.contains("Inquiry activity"));
    assert!(prompt.contains(GROUNDING_CLAUSE));

    let session = tutor.session(2).await.unwrap();
    assert_eq!(session.material_chunks.len(), 75);
    assert!(session.textbook_content.is_empty());
    let indices: Vec<usize> = session.material_chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, (0..75).collect::<Vec<_>>());
}

#[tokio::test]
async fn e2e_followup_relevance_windowing() {
    let chapter = long_chapter();
    assert!(chapter.len() >= 40_000);

    let window = extract_text_window("What is Euclid's Division Lemma?", &chapter, 5000, 20);
    assert!(window.chars().count() <= 5000);
    assert!(window.contains("Euclid's Division Lemma"));

    let primary = Arc::new(ScriptedProvider::new("The lemma states a = bq + r."));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary.clone(), fallback, &chapter).await;

    tutor.start_session(start(3, "Real Numbers")).await;
    assert_eq!(tutor.session(3).await.unwrap().textbook_content, chapter);

    tutor.chat(chat(3, "What is Euclid's Division Lemma?")).await.unwrap();
    let prompt = primary.last_prompt();
    assert!(prompt.contains(&window));
    assert!(prompt.len() < 10_000);
}

#[tokio::test]
async fn e2e_provider_failover_keeps_handle() {
    let primary = Arc::new(ScriptedProvider::new("Overview").with_handle("conv-1"));
    let fallback = Arc::new(ScriptedProvider::new("Fallback answer"));
    let tutor = tutor_with(primary.clone(), fallback.clone(), REAL_NUMBERS).await;

    tutor.start_session(start(4, "Real Numbers")).await;
    assert_eq!(
        tutor.session(4).await.unwrap().provider_conversation_handle.as_deref(),
        Some("conv-1")
    );

    primary.set_failing(true);
    let reply = tutor.chat(chat(4, "What is HCF?")).await.unwrap();

    assert!(reply.model_used.starts_with("Fallback"));
    assert_eq!(reply.response, "Fallback answer");
    assert_eq!(fallback.calls(), 1);

    let session = tutor.session(4).await.unwrap();
    assert_eq!(session.provider_conversation_handle.as_deref(), Some("conv-1"));
    assert_eq!(session.messages.len(), 3);
}

#[tokio::test]
async fn e2e_double_failure_returns_apology() {
    let primary = Arc::new(ScriptedProvider::failing());
    let fallback = Arc::new(ScriptedProvider::failing());
    let tutor = tutor_with(primary, fallback, REAL_NUMBERS).await;

    let started = tutor.start_session(start(5, "Real Numbers")).await;
    assert_eq!(started.model_used, ERROR_LABEL);
    assert_eq!(tutor.session(5).await.unwrap().messages.len(), 1);

    let reply = tutor.chat(chat(5, "Explain HCF")).await.unwrap();
    assert_eq!(reply.model_used, "Error");
    assert_eq!(reply.response, APOLOGY_SENTINEL);

    let session = tutor.session(5).await.unwrap();
    assert_eq!(session.messages.len(), 3);
    assert_eq!(session.messages[2].content, APOLOGY_SENTINEL);
    assert!(session.provider_conversation_handle.is_none());
}

#[tokio::test]
async fn e2e_hindi_material_still_answers_in_english() {
    let primary = Arc::new(ScriptedProvider::new("Overview in English"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary.clone(), fallback, REAL_NUMBERS).await;

    let mut request = start(6, "वास्तविक संख्याएँ");
    request.material_id = Some(77);
    let response = tutor.start_session(request).await;
    assert_eq!(response.source_type, SourceType::UploadedMaterial);

    let session = tutor.session(6).await.unwrap();
    assert_eq!(session.material_language, MaterialLanguage::Hindi);
    assert!(primary.last_prompt().contains("Respond in English"));
}

// ── Boundaries and laws ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_unknown_board_uses_outline() {
    let primary = Arc::new(ScriptedProvider::new("Outline overview"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary.clone(), fallback, REAL_NUMBERS).await;

    let mut request = start(7, "Real Numbers");
    request.board = Board::parse("ICSE");
    let response = tutor.start_session(request).await;

    assert_eq!(response.source_type, SourceType::Curriculum);
    assert!(!response.initial_message.is_empty());
    assert!(!primary.last_prompt().contains(REAL_NUMBERS));
    assert!(tutor.session(7).await.unwrap().textbook_content.is_empty());
}

#[tokio::test]
async fn e2e_missing_material_downgrades() {
    let primary = Arc::new(ScriptedProvider::new("ok"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary, fallback, REAL_NUMBERS).await;

    let mut request = start(8, "Real Numbers");
    request.material_id = Some(12345);
    let response = tutor.start_session(request).await;
    assert_eq!(response.source_type, SourceType::Curriculum);
    assert!(response.material_filename.is_none());
}

#[tokio::test]
async fn e2e_clear_then_chat_is_not_found() {
    let primary = Arc::new(ScriptedProvider::new("ok").with_handle("conv-9"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary, fallback, REAL_NUMBERS).await;

    tutor.start_session(start(9, "Real Numbers")).await;
    tutor.clear_session(9).await.unwrap();

    assert!(tutor.session(9).await.is_none());
    let err = tutor.chat(chat(9, "Still there?")).await.unwrap_err();
    assert!(matches!(err, TutorError::SessionNotFound(9)));
}

#[tokio::test]
async fn e2e_identical_chats_are_deterministic() {
    let primary = Arc::new(ScriptedProvider::new("Deterministic answer"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = tutor_with(primary, fallback, REAL_NUMBERS).await;
    tutor.start_session(start(10, "Real Numbers")).await;

    let first = tutor.chat(chat(10, "What is a prime?")).await.unwrap();
    let second = tutor.chat(chat(10, "What is a prime?")).await.unwrap();
    assert_eq!(first.response, second.response);

    let session = tutor.session(10).await.unwrap();
    assert_eq!(session.messages.len(), 5);
    let roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn e2e_concurrent_sessions_stay_isolated() {
    let primary = Arc::new(ScriptedProvider::new("answer"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = Arc::new(tutor_with(primary, fallback, REAL_NUMBERS).await);

    for id in 20..24 {
        tutor.start_session(start(id, "Real Numbers")).await;
    }

    let mut handles = Vec::new();
    for id in 20..24 {
        let tutor = tutor.clone();
        handles.push(tokio::spawn(async move {
            for turn in 0..3 {
                tutor.chat(chat(id, &format!("question {turn}"))).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(tutor.active_sessions().await, 4);
    for id in 20..24 {
        let session = tutor.session(id).await.unwrap();
        assert_eq!(session.messages.len(), 7);
        assert_eq!(session.messages[1].content, "question 0");
        assert_eq!(session.messages[5].content, "question 2");
    }
}

#[tokio::test]
async fn e2e_vector_store_is_shared_read_only() {
    let store = vector_store().await;
    let before = store.get_all_chunks("material_42").await.unwrap().len();

    let primary = Arc::new(ScriptedProvider::new("ok"));
    let fallback = Arc::new(ScriptedProvider::new("unused"));
    let tutor = TutorOrchestrator::new(dispatcher(primary, fallback))
        .with_vector_store(store.clone(), "pedagogy");

    let mut request = start(30, "Real Numbers");
    request.material_id = Some(42);
    tutor.start_session(request).await;
    tutor.chat(chat(30, "HCF")).await.unwrap();

    assert_eq!(store.get_all_chunks("material_42").await.unwrap().len(), before);
}
