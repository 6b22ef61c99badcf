//! Configuration for the LandComp orchestration core.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment. Environment variables are prefixed with `LANDCOMP_` and
//! nested fields are separated with `__` (e.g. `LANDCOMP_SCORER__NORMALIZATION`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Which provider protocol a configured endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI chat-completions API (OpenAI, Azure, compatible endpoints).
    OpenAiCompat,
    /// Google Gemini generateContent API.
    Gemini,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAiCompat => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

/// One provider endpoint in the dispatch preference order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Protocol spoken by this endpoint.
    pub kind: ProviderKind,
    /// Model identifier (e.g. "gpt-4o-mini", "gemini-2.0-flash").
    pub model: String,
    /// Environment variable holding the primary API key.
    pub api_key_env: String,
    /// Environment variables holding fallback keys for the same provider,
    /// tried in order after the primary is rate limited.
    #[serde(default)]
    pub extra_key_envs: Vec<String>,
    /// Optional base URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum tokens to generate per reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl ProviderConfig {
    /// Resolve every configured API key present in the environment,
    /// primary first. Returns `EnvVarMissing` when not even the primary
    /// key is set.
    pub fn resolve_api_keys(&self) -> Result<Vec<String>, ConfigError> {
        let mut keys = Vec::new();
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.is_empty() {
                keys.push(key);
            }
        }
        for env_name in &self.extra_key_envs {
            if let Ok(key) = std::env::var(env_name) {
                if !key.is_empty() {
                    keys.push(key);
                }
            }
        }
        if keys.is_empty() {
            return Err(ConfigError::EnvVarMissing {
                var: self.api_key_env.clone(),
            });
        }
        Ok(keys)
    }

    /// Validate this provider config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.is_empty() {
            warnings.push(format!("provider {}: model is empty", self.kind));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "provider {}: temperature ({}) is outside the typical range 0.0-2.0",
                self.kind, self.temperature
            ));
        }
        if self.max_tokens == 0 {
            warnings.push(format!("provider {}: max_tokens is zero", self.kind));
        }
        warnings
    }
}

/// Scorer tuning knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Score at which confidence saturates to 1.0.
    pub normalization: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self { normalization: 5.0 }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language used when a persona has no localization for the active one.
    pub default_language: String,
    /// Directory for file-backed session storage; in-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_dir: Option<PathBuf>,
    /// Optional proxy URL (http, https, or socks5) for provider traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Per-attempt timeout for provider requests, in seconds.
    pub request_timeout_secs: u64,
    /// Scorer tuning.
    #[serde(default)]
    pub scorer: ScorerConfig,
    /// Providers in dispatch preference order.
    pub providers: Vec<ProviderConfig>,
    /// Optional path to a TOML lexicon overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexicon_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            session_dir: None,
            proxy_url: None,
            request_timeout_secs: 60,
            scorer: ScorerConfig::default(),
            providers: vec![
                ProviderConfig {
                    kind: ProviderKind::OpenAiCompat,
                    model: "gpt-4o-mini".to_string(),
                    api_key_env: "OPENAI_API_KEY".to_string(),
                    extra_key_envs: Vec::new(),
                    base_url: None,
                    max_tokens: 1024,
                    temperature: 0.7,
                },
                ProviderConfig {
                    kind: ProviderKind::Gemini,
                    model: "gemini-2.0-flash".to_string(),
                    api_key_env: "GEMINI_API_KEY".to_string(),
                    extra_key_envs: vec![
                        "GEMINI_API_KEY_2".to_string(),
                        "GEMINI_API_KEY_3".to_string(),
                    ],
                    base_url: None,
                    max_tokens: 1024,
                    temperature: 0.7,
                },
            ],
            lexicon_path: None,
        }
    }
}

impl AppConfig {
    /// Validate the whole configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.providers.is_empty() {
            warnings.push("no providers configured; dispatch will always be unavailable".into());
        }
        for provider in &self.providers {
            warnings.extend(provider.validate());
        }
        if self.request_timeout_secs == 0 {
            warnings.push("request_timeout_secs is zero; every dispatch will time out".into());
        }
        if let Some(proxy) = &self.proxy_url {
            match url::Url::parse(proxy) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "socks5") => {}
                Ok(parsed) => warnings.push(format!(
                    "proxy_url scheme '{}' is not http/https/socks5",
                    parsed.scheme()
                )),
                Err(e) => warnings.push(format!("proxy_url is not a valid URL: {}", e)),
            }
        }
        warnings
    }
}

/// Default user config file path (`~/.config/landcomp/config.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "landcomp")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration with figment layering:
/// defaults -> user config file -> explicit file -> `LANDCOMP_` env vars.
pub fn load_config(config_file: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(user_config) = default_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path: path.clone() });
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("LANDCOMP_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
