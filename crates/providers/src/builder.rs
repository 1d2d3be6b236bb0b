//! Build providers and the dispatcher from configuration.

use crate::chatflow::ChatflowProvider;
use crate::dispatcher::{DispatchEntry, LlmDispatcher};
use crate::openai_compat::OpenAiCompatProvider;
use shiksha_config::{AppConfig, ProviderConfig};
use shiksha_core::error::ProviderError;
use shiksha_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the stateful primary provider, if a key is configured.
pub fn build_primary(config: &ProviderConfig) -> Option<Arc<dyn Provider>> {
    let api_key = configured_key(config)?;
    let provider = ChatflowProvider::new(api_key, Duration::from_secs(config.timeout_secs))
        .with_base_url(&config.base_url);
    Some(Arc::new(provider))
}

/// Build the stateless OpenAI-compatible fallback provider, if a key is configured.
pub fn build_fallback(config: &ProviderConfig) -> Option<Arc<OpenAiCompatProvider>> {
    let api_key = configured_key(config)?;
    Some(Arc::new(OpenAiCompatProvider::with_timeout(
        "fallback",
        &config.base_url,
        api_key,
        Duration::from_secs(config.timeout_secs),
    )))
}

/// Build the dispatcher from both provider sections.
///
/// Fails with `NotConfigured` when neither section carries a key.
pub fn build_dispatcher(config: &AppConfig) -> Result<LlmDispatcher, ProviderError> {
    let primary = build_primary(&config.primary).map(|p| entry(p, &config.primary));
    let fallback = build_fallback(&config.fallback)
        .map(|p| entry(p as Arc<dyn Provider>, &config.fallback));

    info!(
        primary = primary.is_some(),
        fallback = fallback.is_some(),
        "Building LLM dispatcher"
    );

    Ok(LlmDispatcher::new(primary, fallback)?.with_temperature(config.temperature))
}

fn entry(provider: Arc<dyn Provider>, config: &ProviderConfig) -> DispatchEntry {
    DispatchEntry::new(
        provider,
        &config.model,
        Duration::from_secs(config.timeout_secs),
    )
    .with_max_tokens(config.max_tokens)
}

fn configured_key(config: &ProviderConfig) -> Option<String> {
    if config.is_configured() {
        config.api_key.clone()
    } else {
        None
    }
}
