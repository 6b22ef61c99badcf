//! Integration tests for the LandComp orchestrator.
//!
//! These tests exercise the full pipeline end-to-end using
//! MockChatProvider, verifying Select → Compose → Dispatch → Append works
//! correctly across providers, keys, and sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use landcomp_core::dispatch::ProviderSlot;
use landcomp_core::providers::{ChatProvider, MockChatProvider};
use landcomp_core::session::{InMemorySessionStore, SessionStore};
use landcomp_core::{
    AppConfig, DispatchClient, Orchestrator, PersonaId, ProviderError, Role,
};

fn slot(name: &str, mocks: Vec<Arc<MockChatProvider>>) -> ProviderSlot {
    ProviderSlot {
        name: name.to_string(),
        keyed_clients: mocks
            .into_iter()
            .map(|m| m as Arc<dyn ChatProvider>)
            .collect(),
    }
}

fn orchestrator(slots: Vec<ProviderSlot>) -> (Orchestrator, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::new());
    let dispatch = DispatchClient::with_providers(slots, Duration::from_secs(5));
    let orchestrator = Orchestrator::with_dispatch(AppConfig::default(), dispatch, store.clone());
    (orchestrator, store)
}

#[tokio::test]
async fn invalid_openai_key_falls_through_to_gemini() {
    let openai = Arc::new(MockChatProvider::new());
    openai.queue_error(ProviderError::AuthFailed {
        provider: "openai".into(),
    });
    let gemini = Arc::new(MockChatProvider::with_response("Розы сорта Фламентанц."));

    let (orchestrator, _) = orchestrator(vec![
        slot("openai", vec![openai.clone()]),
        slot("gemini", vec![gemini.clone()]),
    ]);

    let reply = orchestrator
        .process_message(
            "Какие розы посадить?",
            Vec::new(),
            "s1",
            "ru",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.text, "Розы сорта Фламентанц.");
    assert_eq!(reply.persona, Some(PersonaId::Gardener));
    assert_eq!(openai.calls(), 1);
    assert_eq!(gemini.calls(), 1);
}

#[tokio::test]
async fn rate_limited_gemini_key_rotates_without_surfacing_error() {
    let key_primary = Arc::new(MockChatProvider::new());
    key_primary.queue_error(ProviderError::RateLimited {
        provider: "gemini".into(),
        retry_after_secs: 30,
    });
    let key_fallback = Arc::new(MockChatProvider::with_response("Ответ с запасного ключа."));

    let (orchestrator, _) = orchestrator(vec![slot(
        "gemini",
        vec![key_primary.clone(), key_fallback.clone()],
    )]);

    let reply = orchestrator
        .process_message(
            "Какие розы посадить?",
            Vec::new(),
            "s1",
            "ru",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.text, "Ответ с запасного ключа.");
    assert_eq!(key_primary.calls(), 1);
    assert_eq!(key_fallback.calls(), 1);
}

#[tokio::test]
async fn rotation_hint_persists_across_messages() {
    let key_primary = Arc::new(MockChatProvider::new());
    key_primary.queue_error(ProviderError::RateLimited {
        provider: "gemini".into(),
        retry_after_secs: 30,
    });
    let key_fallback = Arc::new(MockChatProvider::with_response("ok"));

    let (orchestrator, _) = orchestrator(vec![slot(
        "gemini",
        vec![key_primary.clone(), key_fallback.clone()],
    )]);

    for message in ["Какие розы посадить?", "Как поливать газон?"] {
        orchestrator
            .process_message(message, Vec::new(), "s1", "ru", None, &CancellationToken::new())
            .await
            .unwrap();
    }

    // First message rotated to the fallback key; the second starts there
    // directly instead of re-hitting the rate-limited primary.
    assert_eq!(key_primary.calls(), 1);
    assert_eq!(key_fallback.calls(), 2);
}

#[tokio::test]
async fn sessions_are_isolated_and_ordered() {
    let mock = Arc::new(MockChatProvider::with_response("ответ"));
    let (orchestrator, store) = orchestrator(vec![slot("gemini", vec![mock])]);

    orchestrator
        .process_message(
            "Какие розы посадить?",
            Vec::new(),
            "garden-session",
            "ru",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    orchestrator
        .process_message(
            "Какой фундамент нужен для беседки?",
            Vec::new(),
            "build-session",
            "ru",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let garden = store.history("garden-session").await.unwrap();
    let build = store.history("build-session").await.unwrap();
    assert_eq!(garden.len(), 2);
    assert_eq!(build.len(), 2);
    assert_eq!(garden[0].role, Role::User);
    assert!(garden[0].text.contains("розы"));
    assert!(build[0].text.contains("фундамент"));
}

#[tokio::test]
async fn builder_questions_route_to_builder_persona() {
    let mock = Arc::new(MockChatProvider::with_response("Ленточный фундамент."));
    let (orchestrator, _) = orchestrator(vec![slot("gemini", vec![mock])]);

    let reply = orchestrator
        .process_message(
            "Какой фундамент нужен для беседки?",
            Vec::new(),
            "s1",
            "ru",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply.persona, Some(PersonaId::Builder));
}

#[tokio::test]
async fn exhausted_providers_never_panic_and_reply_politely() {
    let p1 = Arc::new(MockChatProvider::new());
    p1.queue_error(ProviderError::Unavailable {
        provider: "openai".into(),
        message: "502".into(),
    });
    let p2 = Arc::new(MockChatProvider::new());
    p2.queue_error(ProviderError::MalformedResponse {
        provider: "gemini".into(),
        message: "no candidates".into(),
    });

    let (orchestrator, _) = orchestrator(vec![slot("openai", vec![p1]), slot("gemini", vec![p2])]);

    let reply = orchestrator
        .process_message(
            "How do I start a compost pile?",
            Vec::new(),
            "s1",
            "en",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.persona, Some(PersonaId::Ecologist));
    assert!(reply.text.contains("unavailable"));
    assert!(!reply.text.contains("502"));
    assert!(!reply.text.contains("no candidates"));
}
