//! Configuration loading, validation, and management for Shiksha.
//!
//! Loads configuration from `~/.shiksha/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.shiksha/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sampling temperature for both providers
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Stateful primary provider (keeps a server-side conversation)
    #[serde(
        default = "ProviderConfig::primary_defaults",
        deserialize_with = "ProviderConfig::deserialize_primary"
    )]
    pub primary: ProviderConfig,

    /// Stateless OpenAI-compatible fallback provider
    #[serde(
        default = "ProviderConfig::fallback_defaults",
        deserialize_with = "ProviderConfig::deserialize_fallback"
    )]
    pub fallback: ProviderConfig,

    /// Vector index configuration
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Curriculum catalog configuration
    #[serde(default)]
    pub curriculum: CurriculumConfig,

    /// Tutoring pipeline limits
    #[serde(default)]
    pub tutor: TutorConfig,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderConfig {
    fn primary_defaults() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.dify.ai/v1".into(),
            model: "tutor-chatflow".into(),
            timeout_secs: 120,
            max_tokens: default_max_tokens(),
        }
    }

    fn fallback_defaults() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            timeout_secs: 60,
            max_tokens: default_max_tokens(),
        }
    }

    fn deserialize_primary<'de, D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(ProviderSection::deserialize(d)?.over(Self::primary_defaults()))
    }

    fn deserialize_fallback<'de, D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(ProviderSection::deserialize(d)?.over(Self::fallback_defaults()))
    }

    /// A provider is usable once it has a non-empty key.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// A `[primary]` or `[fallback]` table as written. Missing fields take the
/// slot's own defaults.
#[derive(Deserialize)]
struct ProviderSection {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
}

impl ProviderSection {
    fn over(self, defaults: ProviderConfig) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.or(defaults.api_key),
            base_url: self.base_url.unwrap_or(defaults.base_url),
            model: self.model.unwrap_or(defaults.model),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_vector_backend")]
    pub backend: String,

    #[serde(default = "default_vector_path")]
    pub path: String,

    /// "hashing" for offline feature hashing, otherwise an embeddings model
    /// served by the fallback provider's endpoint
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_pedagogy_collection")]
    pub pedagogy_collection_name: String,
}

fn default_vector_backend() -> String {
    "sqlite".into()
}
fn default_vector_path() -> String {
    "~/.shiksha/vectors.db".into()
}
fn default_embedding_model() -> String {
    "hashing".into()
}
fn default_pedagogy_collection() -> String {
    "pedagogy".into()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            path: default_vector_path(),
            embedding_model: default_embedding_model(),
            pedagogy_collection_name: default_pedagogy_collection(),
        }
    }
}

impl VectorStoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

fn default_catalog_path() -> String {
    "~/.shiksha/catalog.json".into()
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
        }
    }
}

impl CurriculumConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.catalog_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_history_message_chars")]
    pub history_message_chars: usize,

    #[serde(default = "default_window_max_chars")]
    pub window_max_chars: usize,

    #[serde(default = "default_window_context_lines")]
    pub window_context_lines: usize,

    #[serde(default = "default_material_top_k")]
    pub material_top_k: usize,

    #[serde(default = "default_overview_chunk_limit")]
    pub overview_chunk_limit: usize,

    #[serde(default = "default_pedagogy_top_k")]
    pub pedagogy_top_k: usize,

    #[serde(default = "default_pedagogy_excerpt_chars")]
    pub pedagogy_excerpt_chars: usize,
}

fn default_history_window() -> usize {
    6
}
fn default_history_message_chars() -> usize {
    400
}
fn default_window_max_chars() -> usize {
    5000
}
fn default_window_context_lines() -> usize {
    20
}
fn default_material_top_k() -> usize {
    5
}
fn default_overview_chunk_limit() -> usize {
    50
}
fn default_pedagogy_top_k() -> usize {
    2
}
fn default_pedagogy_excerpt_chars() -> usize {
    150
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            history_message_chars: default_history_message_chars(),
            window_max_chars: default_window_max_chars(),
            window_context_lines: default_window_context_lines(),
            material_top_k: default_material_top_k(),
            overview_chunk_limit: default_overview_chunk_limit(),
            pedagogy_top_k: default_pedagogy_top_k(),
            pedagogy_excerpt_chars: default_pedagogy_excerpt_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.shiksha/config.toml),
    /// then apply environment overrides from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides such as `PRIMARY_PROVIDER_KEY` or `VECTOR_STORE_PATH`.
    ///
    /// `lookup` abstracts the environment so tests don't touch process state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        apply_provider_env(&mut self.primary, "PRIMARY", &lookup);
        apply_provider_env(&mut self.fallback, "FALLBACK", &lookup);

        if let Some(path) = lookup("VECTOR_STORE_PATH") {
            self.vector_store.path = path;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.vector_store.embedding_model = model;
        }
        if let Some(name) = lookup("PEDAGOGY_COLLECTION_NAME") {
            self.vector_store.pedagogy_collection_name = name;
        }
        if let Some(path) = lookup("CURRICULUM_CATALOG_PATH") {
            self.curriculum.catalog_path = path;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shiksha")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        for (name, provider) in [("primary", &self.primary), ("fallback", &self.fallback)] {
            if provider.timeout_secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name}.timeout_secs must be > 0"
                )));
            }
        }

        if !matches!(self.vector_store.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown vector_store.backend '{}' (expected sqlite or memory)",
                self.vector_store.backend
            )));
        }

        let tutor = &self.tutor;
        if tutor.window_max_chars == 0 || tutor.material_top_k == 0 || tutor.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "tutor window sizes must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether at least one LLM provider can be used.
    pub fn has_any_provider(&self) -> bool {
        self.primary.is_configured() || self.fallback.is_configured()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn apply_provider_env(
    provider: &mut ProviderConfig,
    prefix: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    if let Some(key) = lookup(&format!("{prefix}_PROVIDER_KEY")) {
        provider.api_key = Some(key);
    }
    if let Some(url) = lookup(&format!("{prefix}_PROVIDER_BASE_URL")) {
        provider.base_url = url;
    }
    if let Some(model) = lookup(&format!("{prefix}_PROVIDER_MODEL")) {
        provider.model = model;
    }
    if let Some(timeout) = lookup(&format!("{prefix}_PROVIDER_TIMEOUT")) {
        match timeout.trim().parse::<u64>() {
            Ok(secs) => provider.timeout_secs = secs,
            Err(_) => tracing::warn!(
                prefix,
                value = %timeout,
                "Ignoring non-numeric provider timeout override"
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            primary: ProviderConfig::primary_defaults(),
            fallback: ProviderConfig::fallback_defaults(),
            vector_store: VectorStoreConfig::default(),
            curriculum: CurriculumConfig::default(),
            tutor: TutorConfig::default(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None => PathBuf::from(path),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tutor.window_max_chars, 5000);
        assert_eq!(config.tutor.pedagogy_top_k, 2);
        assert!(!config.has_any_provider());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.fallback.model, config.fallback.model);
        assert_eq!(parsed.vector_store.backend, "sqlite");
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.vector_store.backend = "chroma".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.primary.timeout_secs, 120);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[fallback]
api_key = "sk-test"
base_url = "http://localhost:11434/v1"
model = "llama3"
timeout_secs = 30

[tutor]
window_max_chars = 8000
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!(config.fallback.is_configured());
        assert!(!config.primary.is_configured());
        assert_eq!(config.fallback.max_tokens, 4096);
        assert_eq!(config.tutor.window_max_chars, 8000);
        assert_eq!(config.tutor.material_top_k, 5);
    }

    #[test]
    fn key_only_sections_take_slot_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[primary]
api_key = "app-123"

[fallback]
api_key = "sk-test"
model = "gpt-4.1-mini"
"#,
        )
        .unwrap();

        assert!(config.primary.is_configured());
        assert_eq!(config.primary.base_url, "https://api.dify.ai/v1");
        assert_eq!(config.primary.timeout_secs, 120);
        assert_eq!(config.fallback.base_url, "https://api.openai.com/v1");
        assert_eq!(config.fallback.model, "gpt-4.1-mini");
        assert_eq!(config.fallback.timeout_secs, 60);
        assert_eq!(config.fallback.max_tokens, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PRIMARY_PROVIDER_KEY", "app-123"),
            ("PRIMARY_PROVIDER_TIMEOUT", "45"),
            ("FALLBACK_PROVIDER_MODEL", "gpt-4.1-mini"),
            ("PEDAGOGY_COLLECTION_NAME", "dped_corpus"),
            ("VECTOR_STORE_PATH", "/data/vectors.db"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.primary.is_configured());
        assert_eq!(config.primary.timeout_secs, 45);
        assert_eq!(config.fallback.model, "gpt-4.1-mini");
        assert_eq!(config.vector_store.pedagogy_collection_name, "dped_corpus");
        assert_eq!(config.vector_store.resolved_path(), PathBuf::from("/data/vectors.db"));
    }

    #[test]
    fn bad_timeout_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|k| (k == "FALLBACK_PROVIDER_TIMEOUT").then(|| "soon".to_string()));
        assert_eq!(config.fallback.timeout_secs, 60);
    }

    #[test]
    fn blank_key_is_not_configured() {
        let mut config = AppConfig::default();
        config.primary.api_key = Some("   ".into());
        assert!(!config.primary.is_configured());
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.fallback.api_key = Some("sk-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("pedagogy_collection_name"));
        assert!(toml_str.contains("window_max_chars"));
    }
}
