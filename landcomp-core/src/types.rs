//! Core type definitions for the LandComp orchestration pipeline.
//!
//! Defines the fundamental data structures used throughout the system:
//! conversation turns, attachments, dispatch requests and outcomes, and
//! the rotation state threaded through the dispatch client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persona::PersonaId;

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A binary payload attached to a user message, sent inline to providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes as a base64 attachment.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A single turn in a conversation session.
///
/// Turns are append-only: the session store never mutates a stored turn
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a new turn with auto-generated ID and current timestamp.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Attach payloads to this turn.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Token usage reported by a provider for a single completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A request sent to a single chat provider.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Resolved system prompt for the selected persona.
    pub system_prompt: String,
    /// Prior turns of the session, oldest first. The current user message
    /// is the last user turn in this list.
    pub turns: Vec<ConversationTurn>,
    /// Maximum tokens to generate; the provider's configured value when
    /// unset.
    pub max_tokens: Option<u32>,
    /// Sampling temperature; the provider's configured value when unset.
    pub temperature: Option<f32>,
}

/// A successful completion from a chat provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// A fully composed request handed to the dispatch client.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Resolved system prompt for the selected persona.
    pub system_prompt: String,
    /// Current user message text.
    pub user_text: String,
    /// Prior conversation turns, oldest first (history-aware dispatch).
    pub history: Vec<ConversationTurn>,
    /// Attachments for the current message.
    pub attachments: Vec<Attachment>,
    /// Maximum tokens to generate; the provider's configured value when
    /// unset.
    pub max_tokens: Option<u32>,
    /// Sampling temperature; the provider's configured value when unset.
    pub temperature: Option<f32>,
}

impl DispatchRequest {
    /// Flatten history plus the current user message into provider turns.
    pub fn to_chat_request(&self) -> ChatRequest {
        let mut turns = self.history.clone();
        turns.push(
            ConversationTurn::user(self.user_text.clone())
                .with_attachments(self.attachments.clone()),
        );
        ChatRequest {
            system_prompt: self.system_prompt.clone(),
            turns,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// The final outcome of a dispatch across all configured providers.
///
/// Per-provider errors always trigger key rotation or fall-through, so
/// they never surface here directly; the last one is logged when the
/// preference order is exhausted.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// A provider produced a completion.
    Success {
        response: ChatResponse,
        /// Name of the provider that answered.
        provider: String,
        /// Index of the API key that succeeded, for the rotation hint.
        key_index: usize,
    },
    /// Every configured (provider, key) pair was attempted and failed.
    NoProviderAvailable,
    /// The caller cancelled the in-flight dispatch.
    Cancelled,
}

impl DispatchOutcome {
    /// Whether this outcome carries a completion.
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Success { .. })
    }
}

/// Best-effort "last good key" hint threaded through dispatch calls.
///
/// Replaces hidden module-level current-key pointers with explicit state:
/// the caller passes the previous state in and stores the returned state
/// for the next call. Staleness under concurrent use costs at most one
/// redundant attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationState {
    /// Per-provider starting key index, positionally aligned with the
    /// dispatch client's provider preference order.
    pub key_cursor: Vec<usize>,
}

impl RotationState {
    /// Create a fresh state for `provider_count` providers.
    pub fn for_providers(provider_count: usize) -> Self {
        Self {
            key_cursor: vec![0; provider_count],
        }
    }

    /// Starting key index for the provider at `index`.
    pub fn start_key(&self, index: usize) -> usize {
        self.key_cursor.get(index).copied().unwrap_or(0)
    }
}

/// The reply surfaced to the caller of `process_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    /// Final assistant text (localized fallback text for recoverable
    /// failures).
    pub text: String,
    /// Persona that answered, if selection succeeded.
    pub persona: Option<PersonaId>,
    /// Selection confidence, when a persona was matched.
    pub confidence: Option<f64>,
}
