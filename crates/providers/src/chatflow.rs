//! Stateful chat-messages provider (primary path).
//!
//! Speaks the Dify-style `/chat-messages` API:
//! - `Authorization: Bearer` application key
//! - one `query` string per call, `response_mode = "blocking"`
//! - server-side history keyed by `conversation_id`, returned on every answer
//!
//! The returned `conversation_id` is surfaced as
//! `ProviderResponse::conversation_handle` so callers can resume the
//! conversation on the next turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shiksha_core::error::ProviderError;
use shiksha_core::message::{Message, Role};
use shiksha_core::provider::*;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.dify.ai/v1";
const DEFAULT_USER: &str = "shiksha-tutor";

/// Primary provider backed by a hosted chat workflow.
pub struct ChatflowProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatflowProvider {
    /// Create a new chat-messages provider.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: "chatflow".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., a self-hosted deployment).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Collapse the request's messages into the single `query` string the
    /// API accepts. Earlier turns live server-side, so only system and user
    /// content of this call is sent.
    fn build_query(messages: &[Message]) -> String {
        messages
            .iter()
            .filter(|m| matches!(m.role, Role::System | Role::User))
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl Provider for ChatflowProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat-messages", self.base_url);

        let body = ChatMessagesRequest {
            inputs: serde_json::Map::new(),
            query: Self::build_query(&request.messages),
            response_mode: "blocking",
            conversation_id: request.conversation_handle.clone().unwrap_or_default(),
            user: request.user.clone().unwrap_or_else(|| DEFAULT_USER.into()),
        };

        debug!(
            provider = %self.name,
            resuming = request.conversation_handle.is_some(),
            query_chars = body.query.len(),
            "Sending chat-messages request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid application key".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chat-messages endpoint returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ChatMessagesResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse chat-messages response: {e}"))
        })?;

        if api_response.answer.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("Empty answer".into()));
        }

        let usage = api_response
            .metadata
            .and_then(|m| m.usage)
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ProviderResponse {
            message: Message::assistant(api_response.answer),
            usage,
            model: request.model,
            conversation_handle: api_response.conversation_id.filter(|id| !id.is_empty()),
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/parameters", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- Chat-messages API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatMessagesRequest {
    inputs: serde_json::Map<String, serde_json::Value>,
    query: String,
    response_mode: &'static str,
    conversation_id: String,
    user: String,
}

#[derive(Debug, Deserialize)]
struct ChatMessagesResponse {
    answer: String,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
