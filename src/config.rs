//! Application-level configuration loading: storage backend, CORS origins,
//! mutation timeout and the question generation provider.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAMESHOW_BACK_CONFIG_PATH";
/// Default time budget of one serialized session mutation.
const DEFAULT_MUTATION_TIMEOUT_MS: u64 = 5_000;

const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Persistence backend selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store, lost on restart.
    #[default]
    Memory,
    /// CouchDB over HTTP.
    Couch,
}

impl StorageBackend {
    /// Name reported by the health endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Couch => "couch",
        }
    }
}

/// Wire protocol spoken by the question generation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI compatible chat-completions API.
    #[default]
    #[serde(alias = "open_ai")]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
}

impl LlmProvider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAi),
            "anthropic" => Some(LlmProvider::Anthropic),
            _ => None,
        }
    }

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }
}

/// Connection settings of the question generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub anthropic_version: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: None,
            base_url: DEFAULT_LLM_BASE_URL.into(),
            model: DEFAULT_LLM_MODEL.into(),
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.into(),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub storage: StorageBackend,
    /// Allowed CORS origins; `*` (or an empty list) means permissive.
    pub allowed_origins: Vec<String>,
    /// Upper bound for one serialized session mutation.
    pub mutation_timeout: Duration,
    pub llm: LlmSettings,
    /// Path the configuration was read from (or would have been).
    pub source_path: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk and apply environment overrides.
    ///
    /// A missing or unparsable file falls back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let base = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded application config");
                    AppConfig::from_raw(raw, path.clone())
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    AppConfig::with_path(path.clone())
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                AppConfig::with_path(path.clone())
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                AppConfig::with_path(path.clone())
            }
        };

        base.apply_overrides(|key| env::var(key).ok())
    }

    fn with_path(source_path: PathBuf) -> Self {
        Self {
            source_path,
            ..Self::default()
        }
    }

    fn from_raw(raw: RawConfig, source_path: PathBuf) -> Self {
        let defaults = LlmSettings::default();
        let llm = raw.llm.unwrap_or_default();
        Self {
            storage: raw.storage.unwrap_or_default(),
            allowed_origins: raw.allowed_origins.unwrap_or_else(default_origins),
            mutation_timeout: Duration::from_millis(
                raw.mutation_timeout_ms
                    .unwrap_or(DEFAULT_MUTATION_TIMEOUT_MS),
            ),
            llm: LlmSettings {
                provider: llm.provider.unwrap_or_default(),
                api_key: llm.api_key.filter(|key| !key.is_empty()),
                base_url: llm.base_url.unwrap_or(defaults.base_url),
                model: llm.model.unwrap_or(defaults.model),
                anthropic_version: llm.anthropic_version.unwrap_or(defaults.anthropic_version),
            },
            source_path,
        }
    }

    /// Override settings with values returned by `lookup` (environment variables in production).
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("STORAGE_BACKEND") {
            match value.trim().to_ascii_lowercase().as_str() {
                "memory" => self.storage = StorageBackend::Memory,
                "couch" | "couchdb" => self.storage = StorageBackend::Couch,
                other => warn!(value = %other, "ignoring unknown STORAGE_BACKEND"),
            }
        }
        if let Some(value) = get("ALLOWED_ORIGINS") {
            self.allowed_origins = value
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }
        if let Some(value) = get("LLM_PROVIDER") {
            match LlmProvider::parse(&value) {
                Some(provider) => self.llm.provider = provider,
                None => warn!(value = %value, "ignoring unknown LLM_PROVIDER"),
            }
        }

        let mut api_key = get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY"));
        if api_key.is_none() && self.llm.api_key.is_none() && self.llm.provider == LlmProvider::Anthropic {
            api_key = get("ANTHROPIC_API_KEY");
        }
        if api_key.is_some() {
            self.llm.api_key = api_key;
        }

        if let Some(value) = get("LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = get("LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = get("LLM_ANTHROPIC_VERSION") {
            self.llm.anthropic_version = value;
        }
        self.llm.base_url = self.llm.base_url.trim_end_matches('/').to_string();
        self
    }

    /// Whether CORS should accept any origin.
    pub fn permissive_cors(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|origin| origin == "*")
    }

    /// Emit a one-line summary of the effective configuration. Never logs the API key.
    pub fn log_summary(&self) {
        info!(
            path = %self.source_path.display(),
            storage = ?self.storage,
            origins = ?self.allowed_origins,
            mutation_timeout_ms = self.mutation_timeout.as_millis() as u64,
            llm_provider = self.llm.provider.as_str(),
            llm_base_url = %self.llm.base_url,
            llm_model = %self.llm.model,
            llm_api_key_present = self.llm.api_key.is_some(),
            "effective configuration"
        );
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            allowed_origins: default_origins(),
            mutation_timeout: Duration::from_millis(DEFAULT_MUTATION_TIMEOUT_MS),
            llm: LlmSettings::default(),
            source_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    storage: Option<StorageBackend>,
    allowed_origins: Option<Vec<String>>,
    mutation_timeout_ms: Option<u64>,
    llm: Option<RawLlm>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLlm {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    anthropic_version: Option<String>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_origins() -> Vec<String> {
    vec!["*".into()]
}
