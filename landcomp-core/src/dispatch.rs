//! Multi-provider dispatch with key rotation and fall-through.
//!
//! Providers are tried in configured preference order. Within a provider,
//! a rate-limited key rotates to the next configured key of the same
//! provider; any other error abandons the provider and falls through to
//! the next one. Exactly one attempt is made per (provider, key) pair;
//! there is no backoff state machine. When every pair has been tried the
//! outcome is `NoProviderAvailable`.
//!
//! The "last good key" hint is explicit `RotationState` threaded through
//! each call rather than hidden mutable globals, so rotation is testable
//! in isolation and staleness under concurrency costs at most one
//! redundant attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{ConfigError, ProviderError};
use crate::providers::{build_http_client, create_provider, ChatProvider};
use crate::types::{DispatchOutcome, DispatchRequest, RotationState};

/// One provider in the preference order, with a client per API key.
pub struct ProviderSlot {
    /// Short name for logs ("openai", "gemini").
    pub name: String,
    /// One provider instance per configured API key, primary first.
    pub keyed_clients: Vec<Arc<dyn ChatProvider>>,
}

/// Dispatches requests across the configured providers.
pub struct DispatchClient {
    providers: Vec<ProviderSlot>,
    attempt_timeout: Duration,
}

impl DispatchClient {
    /// Build the dispatch client from configuration.
    ///
    /// Providers whose API keys are absent from the environment are
    /// skipped with a warning rather than failing startup.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = build_http_client(config.proxy_url.as_deref(), timeout)?;

        let mut providers = Vec::new();
        for provider_config in &config.providers {
            match provider_config.resolve_api_keys() {
                Ok(keys) => {
                    let keyed_clients = keys
                        .into_iter()
                        .map(|key| create_provider(provider_config, key, client.clone()))
                        .collect();
                    providers.push(ProviderSlot {
                        name: provider_config.kind.to_string(),
                        keyed_clients,
                    });
                }
                Err(ConfigError::EnvVarMissing { var }) => {
                    warn!(
                        provider = %provider_config.kind,
                        env_var = %var,
                        "Skipping provider with no API key configured"
                    );
                }
                Err(e) => {
                    warn!(provider = %provider_config.kind, error = %e, "Skipping provider");
                }
            }
        }

        Ok(Self {
            providers,
            attempt_timeout: timeout,
        })
    }

    /// Build a dispatch client from pre-built providers (tests, offline mode).
    pub fn with_providers(providers: Vec<ProviderSlot>, attempt_timeout: Duration) -> Self {
        Self {
            providers,
            attempt_timeout,
        }
    }

    /// Number of configured providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Fresh rotation state sized to this client's provider list.
    pub fn initial_rotation_state(&self) -> RotationState {
        RotationState::for_providers(self.providers.len())
    }

    /// Dispatch a request across the provider preference order.
    ///
    /// Returns the outcome together with the updated rotation state; the
    /// caller threads the state into its next call.
    pub async fn dispatch(
        &self,
        request: &DispatchRequest,
        state: RotationState,
        cancel: &CancellationToken,
    ) -> (DispatchOutcome, RotationState) {
        let mut state = state;
        state.key_cursor.resize(self.providers.len(), 0);

        if self.providers.is_empty() {
            warn!("Dispatch requested with no providers configured");
            return (DispatchOutcome::NoProviderAvailable, state);
        }

        let chat_request = request.to_chat_request();
        let mut last_error: Option<ProviderError> = None;

        for (provider_index, slot) in self.providers.iter().enumerate() {
            let key_count = slot.keyed_clients.len();
            if key_count == 0 {
                continue;
            }
            let start = state.start_key(provider_index) % key_count;

            for offset in 0..key_count {
                let key_index = (start + offset) % key_count;
                let client = &slot.keyed_clients[key_index];

                debug!(
                    provider = %slot.name,
                    key_index,
                    "Attempting provider"
                );

                let attempt = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(provider = %slot.name, "Dispatch cancelled by caller");
                        return (DispatchOutcome::Cancelled, state);
                    }
                    result = tokio::time::timeout(
                        self.attempt_timeout,
                        client.complete(&chat_request),
                    ) => result,
                };

                match attempt {
                    Ok(Ok(response)) => {
                        state.key_cursor[provider_index] = key_index;
                        info!(
                            provider = %slot.name,
                            key_index,
                            model = client.model_name(),
                            "Dispatch succeeded"
                        );
                        return (
                            DispatchOutcome::Success {
                                response,
                                provider: slot.name.clone(),
                                key_index,
                            },
                            state,
                        );
                    }
                    Ok(Err(e)) if e.is_rate_limit() => {
                        warn!(
                            provider = %slot.name,
                            key_index,
                            error = %e,
                            "Key rate limited, rotating to next key"
                        );
                        last_error = Some(e);
                        // Next key of the same provider.
                    }
                    Ok(Err(e)) => {
                        warn!(
                            provider = %slot.name,
                            key_index,
                            error = %e,
                            "Provider failed, falling through"
                        );
                        last_error = Some(e);
                        break;
                    }
                    Err(_elapsed) => {
                        let timeout = ProviderError::Timeout {
                            provider: slot.name.clone(),
                            timeout_secs: self.attempt_timeout.as_secs(),
                        };
                        warn!(
                            provider = %slot.name,
                            key_index,
                            error = %timeout,
                            "Attempt timed out, falling through"
                        );
                        last_error = Some(timeout);
                        break;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            warn!(error = %e, "All providers exhausted");
        }
        (DispatchOutcome::NoProviderAvailable, state)
    }
}
