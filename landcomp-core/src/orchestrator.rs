//! The message-processing pipeline.
//!
//! One inbound user message flows Selector → Prompt Composer → Dispatch,
//! then both the user turn and the assistant turn are appended to the
//! session store. Selection failures and provider exhaustion become
//! localized user-facing replies; raw provider error text never reaches
//! the end user.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::dispatch::DispatchClient;
use crate::error::{LandCompError, Result, SelectionError};
use crate::lexicon::Lexicon;
use crate::persona::PersonaCatalog;
use crate::prompt::{build_system_prompt, SessionContext};
use crate::selector::{select_persona, SelectionResult};
use crate::session::SessionStore;
use crate::types::{
    AssistantReply, Attachment, ConversationTurn, DispatchOutcome, DispatchRequest, RotationState,
};

/// Orchestrates the full pipeline for inbound user messages.
///
/// Holds only immutable routing data plus the rotation hint; independent
/// sessions may call `process_message` concurrently. Within one session
/// the caller must submit messages in order, since each depends on the
/// history appended by the previous one.
pub struct Orchestrator {
    catalog: PersonaCatalog,
    lexicon: Lexicon,
    config: AppConfig,
    dispatch: DispatchClient,
    store: Arc<dyn SessionStore>,
    rotation: Mutex<RotationState>,
}

impl Orchestrator {
    /// Build the orchestrator from configuration.
    ///
    /// Loads the builtin lexicon, overlaid with `config.lexicon_path` when
    /// set, and constructs the dispatch client from the configured
    /// providers.
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let mut lexicon = Lexicon::builtin();
        if let Some(path) = &config.lexicon_path {
            let raw = std::fs::read_to_string(path)?;
            lexicon.merge(Lexicon::from_toml_str(&raw)?);
            info!(path = %path.display(), "Loaded lexicon overlay");
        }

        let dispatch = DispatchClient::from_config(&config)?;
        let rotation = Mutex::new(dispatch.initial_rotation_state());

        Ok(Self {
            catalog: PersonaCatalog::builtin(),
            lexicon,
            config,
            dispatch,
            store,
            rotation,
        })
    }

    /// Build an orchestrator around a pre-built dispatch client
    /// (tests, offline mode).
    pub fn with_dispatch(
        config: AppConfig,
        dispatch: DispatchClient,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let rotation = Mutex::new(dispatch.initial_rotation_state());
        Self {
            catalog: PersonaCatalog::builtin(),
            lexicon: Lexicon::builtin(),
            config,
            dispatch,
            store,
            rotation,
        }
    }

    /// The persona catalog used for selection and display.
    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    /// Process one user message end-to-end.
    ///
    /// Returns the assistant reply; `language` comes from the caller's
    /// localization layer and is treated as an opaque code. `Err` is
    /// reserved for empty input, cancellation, and store failures;
    /// selection misses and provider exhaustion produce localized reply
    /// text instead.
    pub async fn process_message(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
        session_id: &str,
        language: &str,
        context: Option<&SessionContext>,
        cancel: &CancellationToken,
    ) -> Result<AssistantReply> {
        let selection = select_persona(text, &self.lexicon, &self.catalog, &self.config.scorer);

        let (persona, confidence) = match selection {
            SelectionResult::Matched {
                persona,
                confidence,
                score,
            } => {
                info!(persona = %persona, score, confidence, "Persona selected");
                (persona, confidence)
            }
            SelectionResult::OutOfScope { matched_phrase } => {
                info!(phrase = %matched_phrase, "Message judged out of scope");
                return self
                    .recoverable_reply(text, session_id, fallback_text(Fallback::OutOfScope, language))
                    .await;
            }
            SelectionResult::Failed(SelectionError::EmptyInput) => {
                return Err(LandCompError::Selection(SelectionError::EmptyInput));
            }
            SelectionResult::Failed(SelectionError::NoMatch) => {
                info!("No persona matched the message");
                return self
                    .recoverable_reply(text, session_id, fallback_text(Fallback::NoMatch, language))
                    .await;
            }
        };

        let persona_record = self
            .catalog
            .get(persona)
            .ok_or_else(|| LandCompError::Session(format!("unknown persona {}", persona)))?;
        let system_prompt = build_system_prompt(
            persona_record,
            language,
            &self.config.default_language,
            context,
        );

        let history = self.store.history(session_id).await?;
        let request = DispatchRequest {
            system_prompt,
            user_text: text.to_string(),
            history,
            attachments: attachments.clone(),
            max_tokens: None,
            temperature: None,
        };

        let state = self.rotation.lock().await.clone();
        let (outcome, new_state) = self.dispatch.dispatch(&request, state, cancel).await;
        *self.rotation.lock().await = new_state;

        let user_turn = ConversationTurn::user(text).with_attachments(attachments);
        match outcome {
            DispatchOutcome::Success {
                response, provider, ..
            } => {
                info!(
                    persona = %persona,
                    provider = %provider,
                    output_tokens = response.usage.output_tokens,
                    "Reply generated"
                );
                self.store.append(session_id, user_turn).await?;
                self.store
                    .append(session_id, ConversationTurn::assistant(response.text.clone()))
                    .await?;
                Ok(AssistantReply {
                    text: response.text,
                    persona: Some(persona),
                    confidence: Some(confidence),
                })
            }
            DispatchOutcome::NoProviderAvailable => {
                warn!(persona = %persona, "No provider available for reply");
                self.store.append(session_id, user_turn).await?;
                Ok(AssistantReply {
                    text: fallback_text(Fallback::Unavailable, language).to_string(),
                    persona: Some(persona),
                    confidence: Some(confidence),
                })
            }
            DispatchOutcome::Cancelled => Err(LandCompError::Cancelled),
        }
    }

    /// Record the user turn and answer with localized fallback text.
    async fn recoverable_reply(
        &self,
        text: &str,
        session_id: &str,
        reply: &str,
    ) -> Result<AssistantReply> {
        self.store
            .append(session_id, ConversationTurn::user(text))
            .await?;
        self.store
            .append(session_id, ConversationTurn::assistant(reply))
            .await?;
        Ok(AssistantReply {
            text: reply.to_string(),
            persona: None,
            confidence: None,
        })
    }
}

/// Kinds of localized fallback replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    OutOfScope,
    NoMatch,
    Unavailable,
}

/// Localized user-facing text for recoverable outcomes.
fn fallback_text(kind: Fallback, language: &str) -> &'static str {
    let russian = language.starts_with("ru");
    match kind {
        Fallback::OutOfScope => {
            if russian {
                "Я помогаю с вопросами о саде, ландшафтном дизайне, строительстве \
                 на участке и экологии — этот вопрос вне моей темы."
            } else {
                "I help with gardening, landscape design, on-site construction, and \
                 ecology questions — that one is outside my field."
            }
        }
        Fallback::NoMatch => {
            if russian {
                "Не совсем понял вопрос. Попробуйте переформулировать: я отвечаю \
                 про сад, ландшафтный дизайн, строительство и экологию участка."
            } else {
                "I didn't quite catch that. Try rephrasing — I answer questions \
                 about gardens, landscape design, construction, and plot ecology."
            }
        }
        Fallback::Unavailable => {
            if russian {
                "Ассистенты сейчас недоступны. Пожалуйста, попробуйте ещё раз \
                 через несколько минут."
            } else {
                "The assistants are unavailable right now. Please try again in a \
                 few minutes."
            }
        }
    }
}
