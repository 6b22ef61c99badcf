//! OpenAI-compatible chat provider.
//!
//! Supports OpenAI and any endpoint that follows the OpenAI chat
//! completions API format. Request and response bodies are typed serde
//! structs; responses that do not match the expected shape fail closed to
//! `ProviderError::MalformedResponse`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ChatProvider;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{ChatRequest, ChatResponse, Role, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const PROVIDER_NAME: &str = "openai";

/// OpenAI-compatible chat provider bound to one API key.
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

// --- Wire types -----------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

/// Message content: plain text, or parts when attachments are present.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Serialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: Option<WireErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: Option<String>,
}

// --------------------------------------------------------------------------

impl OpenAiCompatProvider {
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

    /// Convert the request to the wire format, with the system prompt as
    /// the leading system message.
    fn build_body<'a>(&'a self, request: &ChatRequest) -> WireRequest<'a> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: WireContent::Text(request.system_prompt.clone()),
            });
        }
        for turn in &request.turns {
            let role = match turn.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            let content = if turn.attachments.is_empty() {
                WireContent::Text(turn.text.clone())
            } else {
                let mut parts = vec![WirePart::Text {
                    text: turn.text.clone(),
                }];
                for attachment in &turn.attachments {
                    parts.push(WirePart::ImageUrl {
                        image_url: WireImageUrl {
                            url: format!("data:{};base64,{}", attachment.mime_type, attachment.data),
                        },
                    });
                }
                WireContent::Parts(parts)
            };
            messages.push(WireMessage { role, content });
        }

        WireRequest {
            model: &self.model,
            messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            stream: false,
        }
    }

    /// Map an HTTP status code to the appropriate `ProviderError`.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthFailed {
                provider: PROVIDER_NAME.to_string(),
            },
            429 => ProviderError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after_secs: parse_retry_after(body).unwrap_or(5),
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

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: PROVIDER_NAME.to_string(),
                message: "No choices in response".to_string(),
            })?;

        let text = choice
            .message
            .content
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: PROVIDER_NAME.to_string(),
                message: "Choice has no text content".to_string(),
            })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            text,
            usage,
            model: parsed.model.unwrap_or_default(),
        })
    }
}

/// Extract "try again in Xs" style hints from a 429 error body.
fn parse_retry_after(body: &str) -> Option<u64> {
    let parsed: WireErrorBody = serde_json::from_str(body).ok()?;
    let message = parsed.error?.message?;
    message
        .split("in ")
        .last()
        .and_then(|s| s.trim_end_matches('s').trim_end_matches('.').parse().ok())
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(request);

        debug!(url = %url, model = %self.model, "Sending OpenAI completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                provider: PROVIDER_NAME.to_string(),
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        let response_body =
            response
                .text()
                .await
                .map_err(|e| ProviderError::Unavailable {
                    provider: PROVIDER_NAME.to_string(),
                    message: format!("Failed to read response body: {}", e),
                })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        Self::parse_response(&response_body)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::types::{Attachment, ConversationTurn};

    fn provider() -> OpenAiCompatProvider {
        let config = ProviderConfig {
            kind: ProviderKind::OpenAiCompat,
            model: "gpt-4o-mini".into(),
            api_key_env: "TEST".into(),
            extra_key_envs: Vec::new(),
            base_url: None,
            max_tokens: 512,
            temperature: 0.7,
        };
        OpenAiCompatProvider::new(&config, "sk-test".into(), Client::new())
    }

    #[test]
    fn test_build_body_prepends_system_prompt() {
        let provider = provider();
        let request = ChatRequest {
            system_prompt: "You are a gardener.".into(),
            turns: vec![
                ConversationTurn::user("first"),
                ConversationTurn::assistant("answer"),
                ConversationTurn::user("second"),
            ],
            max_tokens: None,
            temperature: Some(0.7),
        };
        let body = provider.build_body(&request);
        assert_eq!(body.messages.len(), 4);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[1].role, "user");
        assert_eq!(body.messages[2].role, "assistant");
        assert_eq!(body.max_tokens, 512);
    }

    #[test]
    fn test_build_body_inlines_attachments() {
        let provider = provider();
        let request = ChatRequest {
            system_prompt: String::new(),
            turns: vec![ConversationTurn::user("what plant is this?")
                .with_attachments(vec![Attachment::new("image/jpeg", "Zm9v")])],
            max_tokens: Some(256),
            temperature: Some(0.5),
        };
        let body = provider.build_body(&request);
        let json = serde_json::to_value(&body).unwrap();
        let content = &json["messages"][0]["content"];
        assert!(content.is_array());
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/jpeg;base64,Zm9v"
        );
    }

    #[test]
    fn test_parse_response_happy_path() {
        let body = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "Plant them in spring."}}],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7}
        }"#;
        let response = OpenAiCompatProvider::parse_response(body).unwrap();
        assert_eq!(response.text, "Plant them in spring.");
        assert_eq!(response.usage.input_tokens, 42);
        assert_eq!(response.model, "gpt-4o-mini");
    }

    #[test]
    fn test_parse_response_no_choices_is_malformed() {
        let body = r#"{"choices": []}"#;
        let err = OpenAiCompatProvider::parse_response(body).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_response_missing_content_is_malformed() {
        let body = r#"{"choices": [{"message": {"role": "assistant"}}]}"#;
        let err = OpenAiCompatProvider::parse_response(body).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_response_invalid_json_is_malformed() {
        let err = OpenAiCompatProvider::parse_response("not json").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_map_http_error_statuses() {
        use reqwest::StatusCode;
        assert!(matches!(
            OpenAiCompatProvider::map_http_error(StatusCode::UNAUTHORIZED, ""),
            ProviderError::AuthFailed { .. }
        ));
        assert!(matches!(
            OpenAiCompatProvider::map_http_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            OpenAiCompatProvider::map_http_error(StatusCode::BAD_GATEWAY, ""),
            ProviderError::Unavailable { .. }
        ));
    }

    #[test]
    fn test_parse_retry_after_from_error_body() {
        let body = r#"{"error": {"message": "Rate limit reached, try again in 20s"}}"#;
        assert_eq!(parse_retry_after(body), Some(20));
        assert_eq!(parse_retry_after("{}"), None);
    }
}
