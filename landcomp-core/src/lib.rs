//! # LandComp Core
//!
//! Core library for the LandComp landscape assistant.
//! Provides persona selection over a weighted keyword lexicon, system
//! prompt composition, LLM dispatch with key rotation and provider
//! fallback, and conversation session storage.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod lexicon;
pub mod orchestrator;
pub mod persona;
pub mod prompt;
pub mod providers;
pub mod selector;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{AppConfig, ProviderConfig, ProviderKind, ScorerConfig};
pub use dispatch::{DispatchClient, ProviderSlot};
pub use error::{LandCompError, ProviderError, Result, SelectionError};
pub use lexicon::{Keyword, Lexicon};
pub use orchestrator::Orchestrator;
pub use persona::{Persona, PersonaCatalog, PersonaId};
pub use prompt::{build_system_prompt, SessionContext};
pub use providers::{ChatProvider, MockChatProvider};
pub use selector::{select_persona, ScoredCandidate, SelectionResult};
pub use session::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use types::{
    AssistantReply, Attachment, ChatRequest, ChatResponse, ConversationTurn, DispatchOutcome,
    DispatchRequest, Role, RotationState, TokenUsage,
};
