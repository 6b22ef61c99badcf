//! Error types for the LandComp orchestration core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering persona selection, provider interaction, and configuration.

/// Top-level error type for the LandComp core library.
#[derive(Debug, thiserror::Error)]
pub enum LandCompError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from persona selection over the keyword lexicon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("No persona matched the message")]
    NoMatch,
}

/// Errors from LLM provider interactions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by {provider}, retry after {retry_after_secs}s")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    #[error("Provider {provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("Request to {provider} timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },
}

impl ProviderError {
    /// Whether this error should trigger key rotation on the same provider
    /// rather than an immediate fall-through to the next one.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: std::path::PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `LandCompError`.
pub type Result<T> = std::result::Result<T, LandCompError>;
