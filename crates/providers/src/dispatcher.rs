//! LLM dispatcher: primary provider with conversation continuity, stateless
//! fallback, and a fixed apology when both fail.
//!
//! Per-call state machine:
//!
//! ```text
//! start ──primary configured──▶ primary ──ok──▶ done (handle returned)
//!   │                             │
//!   │                           error/timeout
//!   ▼                             ▼
//!   └──────────────────────────▶ fallback ──ok──▶ done (no handle)
//!                                 │
//!                               error/timeout
//!                                 ▼
//!                               apology ("Error")
//! ```
//!
//! [`LlmDispatcher::generate`] never fails. The caller decides whether to
//! store the returned conversation handle; the dispatcher itself holds no
//! per-session state.

use shiksha_core::error::ProviderError;
use shiksha_core::message::Message;
use shiksha_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Assistant text returned when neither provider produced an answer.
pub const APOLOGY_SENTINEL: &str =
    "I apologize, but I'm unable to generate a response right now. Please try again in a moment.";

/// Model label attached to the apology sentinel.
pub const ERROR_LABEL: &str = "Error";

/// One provider slot of the dispatcher.
pub struct DispatchEntry {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl DispatchEntry {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

/// Which leg of the state machine produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Primary,
    Fallback,
    Failed,
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// `Primary(<model>)`, `Fallback(<model>)` or `Error`
    pub model_label: String,
    /// Set only when the primary provider answered and returned a handle
    pub conversation_handle: Option<String>,
    pub outcome: DispatchOutcome,
}

impl Generation {
    fn apology() -> Self {
        Self {
            text: APOLOGY_SENTINEL.to_string(),
            model_label: ERROR_LABEL.to_string(),
            conversation_handle: None,
            outcome: DispatchOutcome::Failed,
        }
    }
}

/// Reachability of each configured provider, `None` when the slot is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherHealth {
    pub primary: Option<bool>,
    pub fallback: Option<bool>,
}

/// Routes a prompt to the primary provider, then the fallback.
pub struct LlmDispatcher {
    primary: Option<DispatchEntry>,
    fallback: Option<DispatchEntry>,
    temperature: f32,
}

impl LlmDispatcher {
    /// Fails with `NotConfigured` when neither slot is filled.
    pub fn new(
        primary: Option<DispatchEntry>,
        fallback: Option<DispatchEntry>,
    ) -> Result<Self, ProviderError> {
        if primary.is_none() && fallback.is_none() {
            return Err(ProviderError::NotConfigured(
                "neither a primary nor a fallback LLM provider is configured".into(),
            ));
        }

        Ok(Self {
            primary,
            fallback,
            temperature: 0.7,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn primary(&self) -> Option<&DispatchEntry> {
        self.primary.as_ref()
    }

    pub fn fallback(&self) -> Option<&DispatchEntry> {
        self.fallback.as_ref()
    }

    /// Generate a reply for `prompt`.
    ///
    /// `conversation_handle` is forwarded to the primary provider only. The
    /// fallback receives the prompt as a single user message.
    pub async fn generate(
        &self,
        prompt: &str,
        session_id: u64,
        conversation_handle: Option<&str>,
    ) -> Generation {
        let user = format!("session-{session_id}");

        if let Some(entry) = &self.primary {
            let mut request = self.request_for(entry, prompt, &user);
            request.conversation_handle = conversation_handle.map(str::to_string);

            match Self::call(entry, request).await {
                Ok(response) => {
                    let label = format!("Primary({})", reported_model(entry, &response));
                    info!(session_id, model = %label, "Primary provider answered");
                    return Generation {
                        text: response.message.content,
                        model_label: label,
                        conversation_handle: response.conversation_handle,
                        outcome: DispatchOutcome::Primary,
                    };
                }
                Err(e) => {
                    warn!(
                        session_id,
                        provider = %entry.provider.name(),
                        error = %e,
                        "Primary provider failed, trying fallback"
                    );
                }
            }
        } else {
            debug!(session_id, "No primary provider configured");
        }

        if let Some(entry) = &self.fallback {
            let request = self.request_for(entry, prompt, &user);

            match Self::call(entry, request).await {
                Ok(response) => {
                    let label = format!("Fallback({})", reported_model(entry, &response));
                    info!(session_id, model = %label, "Fallback provider answered");
                    return Generation {
                        text: response.message.content,
                        model_label: label,
                        conversation_handle: None,
                        outcome: DispatchOutcome::Fallback,
                    };
                }
                Err(e) => {
                    warn!(
                        session_id,
                        provider = %entry.provider.name(),
                        error = %e,
                        "Fallback provider failed"
                    );
                }
            }
        }

        warn!(session_id, "All providers failed, returning apology");
        Generation::apology()
    }

    /// Check whether each configured provider is reachable.
    pub async fn health_check(&self) -> DispatcherHealth {
        async fn reachable(entry: Option<&DispatchEntry>) -> Option<bool> {
            let entry = entry?;
            let healthy = tokio::time::timeout(entry.timeout, entry.provider.health_check())
                .await
                .map(|r| r.unwrap_or(false))
                .unwrap_or(false);
            Some(healthy)
        }

        DispatcherHealth {
            primary: reachable(self.primary.as_ref()).await,
            fallback: reachable(self.fallback.as_ref()).await,
        }
    }

    fn request_for(&self, entry: &DispatchEntry, prompt: &str, user: &str) -> ProviderRequest {
        ProviderRequest {
            model: entry.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: entry.max_tokens,
            conversation_handle: None,
            user: Some(user.to_string()),
        }
    }

    async fn call(
        entry: &DispatchEntry,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(entry.timeout, entry.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                entry.provider.name(),
                entry.timeout.as_secs()
            ))),
        }
    }
}

fn reported_model<'a>(entry: &'a DispatchEntry, response: &'a ProviderResponse) -> &'a str {
    if response.model.trim().is_empty() {
        &entry.model
    } else {
        &response.model
    }
}
