//! In-process session store.
//!
//! One record per session id, each behind its own mutex. The provider
//! conversation handle lives inside the record, so clearing a session
//! drops both together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shiksha_core::board::{Board, MaterialLanguage};
use shiksha_core::chunk::MaterialChunk;
use shiksha_core::error::TutorError;
use shiksha_core::message::Message;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Which grounding source a session's overview was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    UploadedMaterial,
    Curriculum,
}

/// Everything the tutor remembers about one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutoringSession {
    pub session_id: u64,
    pub teacher_id: u64,
    pub topic_name: String,
    pub subject: String,
    pub grade: String,
    pub state: String,
    pub board: Board,
    pub is_bed_qualified: bool,
    pub material_id: Option<u64>,
    pub material_filename: Option<String>,
    pub material_language: MaterialLanguage,
    /// Full matched chapter text; empty off the textbook path
    pub textbook_content: String,
    /// Every chunk of the uploaded material, in stored order
    pub material_chunks: Vec<MaterialChunk>,
    pub messages: Vec<Message>,
    pub provider_conversation_handle: Option<String>,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
}

impl TutoringSession {
    /// Record a completed turn. The handle is replaced only when one is given.
    pub fn record_turn(&mut self, user: Message, assistant: Message, handle: Option<String>) {
        self.messages.push(user);
        self.messages.push(assistant);
        if handle.is_some() {
            self.provider_conversation_handle = handle;
        }
    }
}

type SessionCell = Arc<Mutex<TutoringSession>>;

/// Session id → record.
///
/// The outer lock guards membership only; turns on one session serialize on
/// that session's mutex while other sessions proceed.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<u64, SessionCell>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session.
    ///
    /// A live session keeps its cell: the new record is written under that
    /// session's mutex, after any turn holding it has committed.
    pub async fn put(&self, session: TutoringSession) {
        let id = session.session_id;
        loop {
            let cell = match self.sessions.write().await.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Mutex::new(session)));
                    return;
                }
                Entry::Occupied(slot) => slot.get().clone(),
            };

            let mut current = cell.lock().await;
            if self.is_current(id, &cell).await {
                *current = session;
                return;
            }
            // cleared while we waited; insert afresh
        }
    }

    /// Whether `cell` is still the live record for `session_id`.
    pub async fn is_current(&self, session_id: u64, cell: &SessionCell) -> bool {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .is_some_and(|live| Arc::ptr_eq(live, cell))
    }

    /// Snapshot of a session.
    pub async fn get(&self, session_id: u64) -> Option<TutoringSession> {
        let cell = self.cell(session_id).await?;
        let session = cell.lock().await;
        Some(session.clone())
    }

    /// Shared handle to a session's mutex, for multi-step updates.
    pub async fn cell(&self, session_id: u64) -> Option<SessionCell> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    pub async fn append_message(&self, session_id: u64, message: Message) -> Result<(), TutorError> {
        let cell = self
            .cell(session_id)
            .await
            .ok_or(TutorError::SessionNotFound(session_id))?;
        cell.lock().await.messages.push(message);
        Ok(())
    }

    pub async fn set_provider_handle(&self, session_id: u64, handle: Option<String>) -> Result<(), TutorError> {
        let cell = self
            .cell(session_id)
            .await
            .ok_or(TutorError::SessionNotFound(session_id))?;
        cell.lock().await.provider_conversation_handle = handle;
        Ok(())
    }

    /// Remove a session and its provider handle. Returns whether it existed.
    pub async fn clear(&self, session_id: u64) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ids of all live sessions, ascending.
    pub async fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.sessions.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
pub(crate) fn sample_session(session_id: u64) -> TutoringSession {
    TutoringSession {
        session_id,
        teacher_id: 1,
        topic_name: "Real Numbers".into(),
        subject: "Mathematics".into(),
        grade: "10".into(),
        state: "Delhi".into(),
        board: Board::Cbse,
        is_bed_qualified: false,
        material_id: None,
        material_filename: None,
        material_language: MaterialLanguage::English,
        textbook_content: "chapter".into(),
        material_chunks: Vec::new(),
        messages: vec![Message::assistant("overview")],
        provider_conversation_handle: None,
        source_type: SourceType::Curriculum,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiksha_core::message::Role;

    #[tokio::test]
    async fn put_get_and_replace() {
        let store = SessionStore::new();
        store.put(sample_session(1)).await;
        assert_eq!(store.get(1).await.unwrap().messages.len(), 1);

        let mut replacement = sample_session(1);
        replacement.topic_name = "Polynomials".into();
        store.put(replacement).await;
        assert_eq!(store.get(1).await.unwrap().topic_name, "Polynomials");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn replacing_a_held_session_waits_and_keeps_its_cell() {
        let store = Arc::new(SessionStore::new());
        store.put(sample_session(6)).await;
        let cell = store.cell(6).await.unwrap();
        let mut held = cell.lock().await;

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut fresh = sample_session(6);
                fresh.topic_name = "Polynomials".into();
                store.put(fresh).await;
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // the in-flight turn still commits into the live record
        held.messages.push(Message::user("in flight"));
        assert!(store.is_current(6, &cell).await);
        assert!(!writer.is_finished());
        drop(held);
        writer.await.unwrap();

        assert!(Arc::ptr_eq(&cell, &store.cell(6).await.unwrap()));
        let session = store.get(6).await.unwrap();
        assert_eq!(session.topic_name, "Polynomials");
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn cleared_cell_is_not_current() {
        let store = SessionStore::new();
        store.put(sample_session(7)).await;
        let cell = store.cell(7).await.unwrap();
        store.clear(7).await;
        assert!(!store.is_current(7, &cell).await);

        store.put(sample_session(7)).await;
        assert!(!store.is_current(7, &cell).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn append_and_handle_require_session() {
        let store = SessionStore::new();
        let err = store.append_message(5, Message::user("hi")).await.unwrap_err();
        assert!(matches!(err, TutorError::SessionNotFound(5)));
        let err = store.set_provider_handle(5, Some("c".into())).await.unwrap_err();
        assert!(matches!(err, TutorError::SessionNotFound(5)));
    }

    #[tokio::test]
    async fn append_message_preserves_order() {
        let store = SessionStore::new();
        store.put(sample_session(2)).await;
        store.append_message(2, Message::user("q")).await.unwrap();
        store.append_message(2, Message::assistant("a")).await.unwrap();

        let roles: Vec<Role> = store.get(2).await.unwrap().messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn clear_drops_record_and_handle() {
        let store = SessionStore::new();
        store.put(sample_session(3)).await;
        store.set_provider_handle(3, Some("conv-1".into())).await.unwrap();
        assert_eq!(
            store.get(3).await.unwrap().provider_conversation_handle.as_deref(),
            Some("conv-1")
        );

        assert!(store.clear(3).await);
        assert!(!store.clear(3).await);
        assert!(store.get(3).await.is_none());
        assert!(store.is_empty().await);
    }

    #[test]
    fn record_turn_keeps_handle_without_new_one() {
        let mut session = sample_session(4);
        session.provider_conversation_handle = Some("conv-1".into());

        session.record_turn(Message::user("q"), Message::assistant("a"), None);
        assert_eq!(session.provider_conversation_handle.as_deref(), Some("conv-1"));

        session.record_turn(Message::user("q2"), Message::assistant("a2"), Some("conv-2".into()));
        assert_eq!(session.provider_conversation_handle.as_deref(), Some("conv-2"));
        assert_eq!(session.messages.len(), 5);
    }

    #[tokio::test]
    async fn ids_are_sorted() {
        let store = SessionStore::new();
        for id in [9, 2, 5] {
            store.put(sample_session(id)).await;
        }
        assert_eq!(store.ids().await, vec![2, 5, 9]);
    }

    #[tokio::test]
    async fn different_sessions_lock_independently() {
        let store = Arc::new(SessionStore::new());
        store.put(sample_session(1)).await;
        store.put(sample_session(2)).await;

        let held = store.cell(1).await.unwrap();
        let _guard = held.lock().await;

        // session 2 stays writable while session 1 is locked
        store.append_message(2, Message::user("parallel")).await.unwrap();
        assert_eq!(store.get(2).await.unwrap().messages.len(), 2);
    }

    #[test]
    fn source_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SourceType::UploadedMaterial).unwrap(),
            "\"uploaded_material\""
        );
    }
}
