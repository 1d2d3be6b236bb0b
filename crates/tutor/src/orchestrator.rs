//! Tutor orchestrator: the public tutoring entry points.
//!
//! # Flow
//!
//! `start_session`: pick one grounding source (uploaded material, matched
//! textbook chapter, or syllabus outline), assemble the overview prompt,
//! dispatch it, and store a fresh session record.
//!
//! `chat`: load the session under its lock, window the stored source down to
//! the question, dispatch with the session's conversation handle, then commit
//! the user and assistant messages together.
//!
//! Missing sources downgrade the grounding path and LLM failures come back as
//! the apology turn. Only an unknown session id reaches the caller as an error.

use crate::chapter_match::best_chapter;
use crate::formatter::{
    FollowupInput, OverviewInput, format_comprehensive_overview, format_followup_prompt,
    format_outline_source,
};
use crate::material::{MaterialRetrieval, MaterialRetriever};
use crate::pedagogy::PedagogyRetriever;
use crate::relevance::{extract_text_window, render_chunks, select_relevant_chunks, truncate_chars};
use crate::session::{SessionStore, SourceType, TutoringSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shiksha_config::TutorConfig;
use shiksha_core::board::{Board, MaterialLanguage};
use shiksha_core::curriculum::{ChapterContent, CurriculumStore};
use shiksha_core::error::TutorError;
use shiksha_core::message::Message;
use shiksha_core::vector::VectorStore;
use shiksha_providers::LlmDispatcher;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub session_id: u64,
    pub teacher_id: u64,
    pub topic_name: String,
    pub subject: String,
    pub grade: String,
    #[serde(default)]
    pub state: String,
    pub board: Board,
    #[serde(default)]
    pub is_bed_qualified: bool,
    #[serde(default)]
    pub material_id: Option<u64>,
    #[serde(default)]
    pub material_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: u64,
    pub initial_message: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_filename: Option<String>,
    pub model_used: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: u64,
    pub user_message: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub is_bed_qualified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: u64,
    pub response: String,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

/// The single grounding source chosen for a session.
enum Grounding {
    Material(MaterialRetrieval),
    Textbook(ChapterContent),
    Outline(String),
}

impl Grounding {
    fn path(&self) -> &'static str {
        match self {
            Grounding::Material(_) => "material",
            Grounding::Textbook(_) => "textbook",
            Grounding::Outline(_) => "outline",
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────

pub struct TutorOrchestrator {
    dispatcher: Arc<LlmDispatcher>,
    curriculum: Option<Arc<dyn CurriculumStore>>,
    materials: Option<MaterialRetriever>,
    pedagogy: Option<PedagogyRetriever>,
    sessions: SessionStore,
    limits: TutorConfig,
}

impl TutorOrchestrator {
    pub fn new(dispatcher: Arc<LlmDispatcher>) -> Self {
        Self {
            dispatcher,
            curriculum: None,
            materials: None,
            pedagogy: None,
            sessions: SessionStore::new(),
            limits: TutorConfig::default(),
        }
    }

    pub fn with_curriculum(mut self, curriculum: Arc<dyn CurriculumStore>) -> Self {
        self.curriculum = Some(curriculum);
        self
    }

    /// Use `store` for both uploaded materials and the pedagogy corpus.
    pub fn with_vector_store(
        mut self,
        store: Arc<dyn VectorStore>,
        pedagogy_collection: impl Into<String>,
    ) -> Self {
        self.materials = Some(MaterialRetriever::new(store.clone()));
        self.pedagogy = Some(PedagogyRetriever::new(store, pedagogy_collection));
        self
    }

    pub fn with_limits(mut self, limits: TutorConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Open (or replace) a session and produce its overview turn.
    pub async fn start_session(&self, request: StartSessionRequest) -> StartSessionResponse {
        let session_id = request.session_id;
        info!(
            session_id,
            teacher_id = request.teacher_id,
            board = %request.board,
            grade = %request.grade,
            subject = %request.subject,
            has_material = request.material_id.is_some(),
            "Starting tutoring session"
        );

        // ── Step 1: Source selection ──
        let grounding = self.select_grounding(&request).await;
        debug!(session_id, path = grounding.path(), "Grounding selected");

        // ── Step 2: Pedagogy (never alongside uploaded material) ──
        let teaching_notes = if request.material_id.is_none() {
            self.teaching_notes(&request).await
        } else {
            Vec::new()
        };

        // ── Step 3: Prompt assembly ──
        let prompt = match &grounding {
            Grounding::Material(retrieval) => {
                let raw = render_chunks(retrieval.chunks.iter().take(self.limits.overview_chunk_limit));
                format_comprehensive_overview(&OverviewInput {
                    raw_content: &raw,
                    topic: &request.topic_name,
                    subject: &request.subject,
                    grade: &request.grade,
                    is_uploaded_material: true,
                    material_language: Some(retrieval.language),
                    teaching_notes: &[],
                })
            }
            Grounding::Textbook(chapter) => format_comprehensive_overview(&OverviewInput {
                raw_content: &chapter.cleaned_content,
                topic: &request.topic_name,
                subject: &request.subject,
                grade: &request.grade,
                is_uploaded_material: false,
                material_language: None,
                teaching_notes: &teaching_notes,
            }),
            Grounding::Outline(outline) => format_comprehensive_overview(&OverviewInput {
                raw_content: outline,
                topic: &request.topic_name,
                subject: &request.subject,
                grade: &request.grade,
                is_uploaded_material: false,
                material_language: None,
                teaching_notes: &teaching_notes,
            }),
        };
        debug!(session_id, prompt_chars = prompt.len(), "Overview prompt assembled");

        // ── Step 4: LLM call ──
        let generation = self.dispatcher.generate(&prompt, session_id, None).await;

        // ── Step 5: Persist ──
        let created_at = Utc::now();
        let (source_type, textbook_content, material_chunks, material_language, source_filename) =
            match grounding {
                Grounding::Material(retrieval) => (
                    SourceType::UploadedMaterial,
                    String::new(),
                    retrieval.chunks,
                    retrieval.language,
                    retrieval.source.map(|s| s.filename),
                ),
                Grounding::Textbook(chapter) => (
                    SourceType::Curriculum,
                    chapter.cleaned_content,
                    Vec::new(),
                    MaterialLanguage::English,
                    None,
                ),
                Grounding::Outline(_) => (
                    SourceType::Curriculum,
                    String::new(),
                    Vec::new(),
                    MaterialLanguage::English,
                    None,
                ),
            };

        let response_filename = match source_type {
            SourceType::UploadedMaterial => request.material_filename.clone().or(source_filename),
            SourceType::Curriculum => None,
        };

        let session = TutoringSession {
            session_id,
            teacher_id: request.teacher_id,
            topic_name: request.topic_name,
            subject: request.subject,
            grade: request.grade,
            state: request.state,
            board: request.board,
            is_bed_qualified: request.is_bed_qualified,
            material_id: request.material_id,
            material_filename: response_filename.clone().or(request.material_filename),
            material_language,
            textbook_content,
            material_chunks,
            messages: vec![Message::assistant(generation.text.clone())],
            provider_conversation_handle: generation.conversation_handle,
            source_type,
            created_at,
        };
        self.sessions.put(session).await;

        info!(
            session_id,
            model = %generation.model_label,
            source_type = ?source_type,
            "Tutoring session started"
        );

        StartSessionResponse {
            session_id,
            initial_message: generation.text,
            source_type,
            material_filename: response_filename,
            model_used: generation.model_label,
            created_at,
        }
    }

    /// Answer a follow-up question within an existing session.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TutorError> {
        let session_id = request.session_id;
        let cell = self
            .sessions
            .cell(session_id)
            .await
            .ok_or(TutorError::SessionNotFound(session_id))?;

        // Held until commit: same-session turns serialize, and a turn
        // dropped before the LLM returns leaves the record untouched.
        let mut session = cell.lock().await;

        let user_message = Message::user(request.user_message.as_str());

        // ── Step 1: Relevance windowing ──
        let relevant = self.relevant_content(&session, &request.user_message);

        // ── Step 2: Follow-up prompt ──
        let history_start = session.messages.len().saturating_sub(self.limits.history_window);
        let subject = if request.subject.trim().is_empty() {
            session.subject.as_str()
        } else {
            request.subject.as_str()
        };
        let prompt = format_followup_prompt(&FollowupInput {
            topic: &session.topic_name,
            subject,
            relevant_content: &relevant,
            question: &request.user_message,
            history: &session.messages[history_start..],
            history_message_chars: self.limits.history_message_chars,
        });
        debug!(
            session_id,
            window_chars = relevant.len(),
            prompt_chars = prompt.len(),
            grade = %request.grade,
            is_bed_qualified = request.is_bed_qualified,
            "Follow-up prompt assembled"
        );

        // ── Step 3: LLM call ──
        let generation = self
            .dispatcher
            .generate(&prompt, session_id, session.provider_conversation_handle.as_deref())
            .await;

        // ── Step 4: Commit ──
        if !self.sessions.is_current(session_id, &cell).await {
            warn!(session_id, "Session cleared during turn, reply discarded");
            return Err(TutorError::SessionNotFound(session_id));
        }
        let timestamp = Utc::now();
        session.record_turn(
            user_message,
            Message::assistant(generation.text.clone()),
            generation.conversation_handle,
        );

        info!(
            session_id,
            model = %generation.model_label,
            messages = session.messages.len(),
            "Chat turn recorded"
        );

        Ok(ChatResponse {
            session_id,
            response: generation.text,
            model_used: generation.model_label,
            timestamp,
        })
    }

    /// Drop a session and its provider conversation handle.
    pub async fn clear_session(&self, session_id: u64) -> Result<(), TutorError> {
        if self.sessions.clear(session_id).await {
            info!(session_id, "Tutoring session cleared");
            Ok(())
        } else {
            Err(TutorError::SessionNotFound(session_id))
        }
    }

    /// Snapshot of a live session.
    pub async fn session(&self, session_id: u64) -> Option<TutoringSession> {
        self.sessions.get(session_id).await
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    pub fn dispatcher(&self) -> &LlmDispatcher {
        &self.dispatcher
    }

    // ── Source selection ──────────────────────────────────────────────────

    async fn select_grounding(&self, request: &StartSessionRequest) -> Grounding {
        if let Some(material_id) = request.material_id {
            match &self.materials {
                Some(retriever) => {
                    let retrieval = retriever.retrieve(material_id, &request.topic_name, true).await;
                    if !retrieval.is_empty() {
                        return Grounding::Material(retrieval);
                    }
                    warn!(
                        session_id = request.session_id,
                        material_id,
                        "Uploaded material has no chunks, using syllabus outline"
                    );
                }
                None => warn!(
                    session_id = request.session_id,
                    material_id,
                    "No vector store configured, using syllabus outline"
                ),
            }
            return Grounding::Outline(self.outline_source(request).await);
        }

        if request.board.uses_ncert_textbooks()
            && let Some(chapter) = self.textbook_chapter(request).await
        {
            return Grounding::Textbook(chapter);
        }

        Grounding::Outline(self.outline_source(request).await)
    }

    async fn textbook_chapter(&self, request: &StartSessionRequest) -> Option<ChapterContent> {
        let curriculum = self.curriculum.as_ref()?;

        let chapters = match curriculum
            .get_available_chapters(&request.grade, &request.subject)
            .await
        {
            Ok(chapters) => chapters,
            Err(e) => {
                warn!(error = %e, "Curriculum unavailable, using syllabus outline");
                return None;
            }
        };

        let Some(found) = best_chapter(&request.topic_name, &chapters) else {
            debug!(
                topic = %request.topic_name,
                candidates = chapters.len(),
                "No chapter matches topic"
            );
            return None;
        };
        let chapter_name = found.chapter.chapter_name.clone();
        debug!(chapter = %chapter_name, score = found.score, "Chapter matched");

        // The full chapter is always preferred over finer topic text.
        match curriculum
            .get_topic_content(&request.grade, &request.subject, &chapter_name, &request.topic_name)
            .await
        {
            Ok(Some(text)) => debug!(topic_chars = text.len(), "Topic text available, using full chapter"),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Topic lookup failed"),
        }

        match curriculum
            .get_chapter_content(&request.grade, &request.subject, &chapter_name)
            .await
        {
            Ok(Some(chapter)) if !chapter.cleaned_content.trim().is_empty() => Some(chapter),
            Ok(_) => {
                warn!(chapter = %chapter_name, "Matched chapter has no content");
                None
            }
            Err(e) => {
                warn!(chapter = %chapter_name, error = %e, "Chapter fetch failed");
                None
            }
        }
    }

    async fn outline_source(&self, request: &StartSessionRequest) -> String {
        let outline = match &self.curriculum {
            Some(curriculum) => match curriculum
                .get_syllabus_outline(&request.board, &request.grade, &request.subject)
                .await
            {
                Ok(outline) => outline,
                Err(e) => {
                    warn!(error = %e, "Syllabus outline lookup failed");
                    None
                }
            },
            None => None,
        };

        format_outline_source(
            outline.as_ref(),
            &request.topic_name,
            &request.subject,
            &request.grade,
            &request.board,
            &request.state,
        )
    }

    async fn teaching_notes(&self, request: &StartSessionRequest) -> Vec<String> {
        let Some(pedagogy) = &self.pedagogy else {
            return Vec::new();
        };

        match pedagogy
            .retrieve(
                &request.topic_name,
                &request.subject,
                &request.grade,
                request.is_bed_qualified,
                self.limits.pedagogy_top_k,
            )
            .await
        {
            Ok(chunks) => chunks
                .iter()
                .map(|c| truncate_chars(c.content.trim(), self.limits.pedagogy_excerpt_chars))
                .collect(),
            Err(e) => {
                warn!(collection = %pedagogy.collection(), error = %e, "Pedagogy retrieval failed");
                Vec::new()
            }
        }
    }

    fn relevant_content(&self, session: &TutoringSession, question: &str) -> String {
        if !session.textbook_content.is_empty() {
            extract_text_window(
                question,
                &session.textbook_content,
                self.limits.window_max_chars,
                self.limits.window_context_lines,
            )
        } else if !session.material_chunks.is_empty() {
            render_chunks(select_relevant_chunks(
                question,
                &session.material_chunks,
                self.limits.material_top_k,
            ))
        } else {
            String::new()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
