//! LLM provider implementations.
//!
//! Provides concrete implementations of the `ChatProvider` trait for:
//! - OpenAI-compatible chat-completions endpoints
//! - Google Gemini generateContent endpoints
//!
//! Use `create_provider()` to instantiate the appropriate provider for a
//! configured endpoint and API key.

pub mod gemini;
pub mod openai_compat;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::types::{ChatRequest, ChatResponse};

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;

/// Trait for chat providers.
///
/// One `complete` call is one HTTP request; retry, key rotation, and
/// provider fall-through live in the dispatch layer, not here.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Short provider name for logs ("openai", "gemini", "mock").
    fn name(&self) -> &str;

    /// The model this provider targets.
    fn model_name(&self) -> &str;
}

/// Build the shared HTTP client for a provider, honoring an optional
/// proxy URL (http, https, or socks5).
pub fn build_http_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10));

    if let Some(url) = proxy_url {
        let proxy = reqwest::Proxy::all(url).map_err(|e| ProviderError::Unavailable {
            provider: "proxy".to_string(),
            message: format!("Invalid proxy URL: {}", e),
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| ProviderError::Unavailable {
        provider: "http".to_string(),
        message: format!("Failed to build HTTP client: {}", e),
    })
}

/// Create a provider instance for one (endpoint, API key) pair.
pub fn create_provider(
    config: &ProviderConfig,
    api_key: String,
    client: reqwest::Client,
) -> Arc<dyn ChatProvider> {
    match config.kind {
        ProviderKind::OpenAiCompat => Arc::new(OpenAiCompatProvider::new(config, api_key, client)),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config, api_key, client)),
    }
}

/// A scripted provider for tests and offline use.
///
/// Queued results are returned in order; once the queue is empty every
/// call yields the fallback text.
pub struct MockChatProvider {
    model: String,
    results: std::sync::Mutex<Vec<Result<ChatResponse, ProviderError>>>,
    call_count: std::sync::Mutex<usize>,
    requests: std::sync::Mutex<Vec<ChatRequest>>,
    fallback_text: String,
}

impl MockChatProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            results: std::sync::Mutex::new(Vec::new()),
            call_count: std::sync::Mutex::new(0),
            requests: std::sync::Mutex::new(Vec::new()),
            fallback_text: "mock reply".to_string(),
        }
    }

    /// A provider that always answers with the given text.
    pub fn with_response(text: &str) -> Self {
        Self {
            fallback_text: text.to_string(),
            ..Self::new()
        }
    }

    /// Queue a result for the next `complete` call (FIFO).
    pub fn queue(&self, result: Result<ChatResponse, ProviderError>) {
        self.results.lock().unwrap().push(result);
    }

    /// Convenience: queue an error.
    pub fn queue_error(&self, error: ProviderError) {
        self.queue(Err(error));
    }

    /// Convenience: build a plain text response.
    pub fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            text: text.to_string(),
            usage: crate::types::TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
        }
    }

    /// Number of completed calls so far.
    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        self.requests.lock().unwrap().push(request.clone());
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Ok(Self::text_response(&self.fallback_text))
        } else {
            results.remove(0)
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
