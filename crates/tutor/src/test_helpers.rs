//! Shared test helpers for tutor tests.

use shiksha_core::error::ProviderError;
use shiksha_core::message::Message;
use shiksha_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// A mock provider that answers every call with the same text and records
/// each prompt and conversation handle it receives.
pub struct ScriptedProvider {
    name: String,
    reply: String,
    model: String,
    handle: Option<String>,
    prompts: Mutex<Vec<String>>,
    handles_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, reply: &str) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
            model: String::new(),
            handle: None,
            prompts: Mutex::new(Vec::new()),
            handles_seen: Mutex::new(Vec::new()),
        }
    }

    /// Return `handle` as the conversation handle on every call.
    pub fn with_handle(mut self, handle: &str) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn handles_seen(&self) -> Vec<Option<String>> {
        self.handles_seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.prompts.lock().unwrap().push(prompt);
        self.handles_seen
            .lock()
            .unwrap()
            .push(request.conversation_handle.clone());

        Ok(ProviderResponse {
            message: Message::assistant(self.reply.clone()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: self.model.clone(),
            conversation_handle: self.handle.clone(),
        })
    }
}

/// A provider that always fails with a server error, counting attempts.
pub struct FailingProvider {
    name: String,
    call_count: Mutex<usize>,
}

impl FailingProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        Err(ProviderError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        })
    }
}

/// A provider that answers "ok" once a permit is released, so a turn can be
/// held mid-flight.
pub struct GatedProvider {
    name: String,
    gate: Semaphore,
    waiting: AtomicUsize,
}

impl GatedProvider {
    /// `open` calls go through without waiting.
    pub fn new(name: &str, open: usize) -> Self {
        Self {
            name: name.into(),
            gate: Semaphore::new(open),
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    /// Calls currently blocked on the gate.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for GatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        permit
            .map_err(|e| ProviderError::Network(e.to_string()))?
            .forget();

        Ok(ProviderResponse {
            message: Message::assistant("ok"),
            usage: None,
            model: String::new(),
            conversation_handle: None,
        })
    }
}
