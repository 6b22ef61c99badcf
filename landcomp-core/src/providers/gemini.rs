//! Google Gemini chat provider.
//!
//! Communicates with the Gemini generateContent API. The system prompt is
//! carried as the top-level `system_instruction` field, conversation roles
//! map to `user`/`model`, and the API key is appended as a `?key=` query
//! parameter. Responses are parsed through typed serde structs and fail
//! closed to `ProviderError::MalformedResponse` on shape mismatches.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ChatProvider;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{ChatRequest, ChatResponse, Role, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER_NAME: &str = "gemini";

/// Gemini chat provider bound to one API key.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

// --- Wire types -----------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireSystemInstruction>,
    contents: Vec<WireContent>,
    #[serde(rename = "generationConfig")]
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
enum WirePart {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "inlineData", rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<WireUsageMetadata>,
    #[serde(rename = "modelVersion", default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct WireCandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: usize,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: usize,
}

// --------------------------------------------------------------------------

impl GeminiProvider {
    pub fn new(config: &ProviderConfig, api_key: String, client: Client) -> Self {
        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Build the generateContent endpoint URL with the key as a query
    /// parameter.
    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    /// Convert the request to Gemini wire format.
    ///
    /// The system prompt becomes `system_instruction`; user turns map to
    /// role `user` and assistant turns to role `model`.
    fn build_body(&self, request: &ChatRequest) -> WireRequest {
        let system_instruction = if request.system_prompt.is_empty() {
            None
        } else {
            Some(WireSystemInstruction {
                parts: vec![WirePart::Text(request.system_prompt.clone())],
            })
        };

        let contents = request
            .turns
            .iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| {
                let role = match turn.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                let mut parts = vec![WirePart::Text(turn.text.clone())];
                for attachment in &turn.attachments {
                    parts.push(WirePart::InlineData {
                        mime_type: attachment.mime_type.clone(),
                        data: attachment.data.clone(),
                    });
                }
                WireContent { role, parts }
            })
            .collect();

        WireRequest {
            system_instruction,
            contents,
            generation_config: WireGenerationConfig {
                max_output_tokens: request.max_tokens.unwrap_or(self.max_tokens),
                temperature: request.temperature.unwrap_or(self.temperature),
            },
        }
    }

    /// Map an HTTP status code to the appropriate `ProviderError`.
    fn map_http_error(status: reqwest::StatusCode) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthFailed {
                provider: PROVIDER_NAME.to_string(),
            },
            429 => ProviderError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after_secs: 30,
            },
            status if status >= 500 => ProviderError::Unavailable {
                provider: PROVIDER_NAME.to_string(),
                message: format!("Server error ({})", status),
            },
            status => ProviderError::Unavailable {
                provider: PROVIDER_NAME.to_string(),
                message: format!("HTTP {}", status),
            },
        }
    }

    fn parse_response(body: &str) -> Result<ChatResponse, ProviderError> {
        let parsed: WireResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::MalformedResponse {
                provider: PROVIDER_NAME.to_string(),
                message: format!("Invalid JSON: {}", e),
            })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: PROVIDER_NAME.to_string(),
                message: "No candidates in response".to_string(),
            })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse {
                provider: PROVIDER_NAME.to_string(),
                message: "Candidate has no text parts".to_string(),
            });
        }

        let usage = parsed
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            text,
            usage,
            model: parsed.model_version.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint_url();
        let body = self.build_body(request);

        debug!(model = %self.model, "Sending Gemini completion request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                provider: PROVIDER_NAME.to_string(),
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable {
                provider: PROVIDER_NAME.to_string(),
                message: format!("Failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status));
        }

        Self::parse_response(&body_text)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
