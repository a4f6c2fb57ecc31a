//! Fallback-capable gateway over the configured text providers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{GenerationOptions, GenerationResult, TextProvider};
use crate::config::{Config, RequestConfig};
use crate::error::{ProviderError, ProviderResult};

/// Uniform entry point for text generation with ordered provider fallback.
///
/// Providers are tried strictly in order, each capped by the per-attempt
/// timeout; a failing provider is never retried within a single call. Only
/// when every provider in the list has failed does the gateway itself fail.
pub struct ProviderGateway {
    providers: Vec<Arc<dyn TextProvider>>,
    attempt_timeout: Duration,
}

impl ProviderGateway {
    /// Create a gateway over providers already in fallback order.
    pub fn new(providers: Vec<Arc<dyn TextProvider>>, request_config: &RequestConfig) -> Self {
        Self {
            providers,
            attempt_timeout: Duration::from_millis(request_config.timeout_ms),
        }
    }

    /// Build a gateway from configuration.
    ///
    /// Walks `fallback_order` and registers each named provider that has an
    /// API key configured; names without a key are skipped with a warning.
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let mut providers: Vec<Arc<dyn TextProvider>> = Vec::new();

        for name in &config.providers.fallback_order {
            match name.as_str() {
                "openai" => {
                    if let Some(key) = &config.providers.openai_api_key {
                        providers.push(Arc::new(super::OpenAiProvider::new(
                            key,
                            &config.providers.openai_base_url,
                            &config.request,
                        )?));
                    } else {
                        warn!(provider = %name, "Skipping provider without API key");
                    }
                }
                "anthropic" => {
                    if let Some(key) = &config.providers.anthropic_api_key {
                        providers.push(Arc::new(super::AnthropicProvider::new(
                            key,
                            &config.providers.anthropic_base_url,
                            &config.request,
                        )?));
                    } else {
                        warn!(provider = %name, "Skipping provider without API key");
                    }
                }
                "gemini" => {
                    if let Some(key) = &config.providers.gemini_api_key {
                        providers.push(Arc::new(super::GeminiProvider::new(
                            key,
                            &config.providers.gemini_base_url,
                            &config.request,
                        )?));
                    } else {
                        warn!(provider = %name, "Skipping provider without API key");
                    }
                }
                other => {
                    warn!(provider = %other, "Unknown provider name in fallback order");
                }
            }
        }

        Ok(Self::new(providers, &config.request))
    }

    /// Names of the registered providers, in fallback order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Generate text, trying each provider in order until one succeeds.
    pub async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        let order = self.attempt_order(options);
        if order.is_empty() {
            return Err(ProviderError::AllProvidersFailed {
                attempted: "none configured".to_string(),
            });
        }

        let mut attempted = Vec::with_capacity(order.len());

        for provider in order {
            let name = provider.name().to_string();
            let start = Instant::now();

            let outcome = tokio::time::timeout(
                self.attempt_timeout,
                provider.generate(prompt, options),
            )
            .await;

            let latency_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(Ok(result)) => {
                    info!(
                        provider = %name,
                        model = %result.model,
                        tokens = result.tokens_used,
                        latency_ms = latency_ms,
                        "Text generation succeeded"
                    );
                    return Ok(result);
                }
                Ok(Err(e)) => {
                    warn!(
                        provider = %name,
                        error = %e,
                        latency_ms = latency_ms,
                        "Provider failed, falling through"
                    );
                }
                Err(_) => {
                    warn!(
                        provider = %name,
                        timeout_ms = self.attempt_timeout.as_millis() as u64,
                        "Provider attempt timed out, falling through"
                    );
                }
            }

            attempted.push(name);
        }

        Err(ProviderError::AllProvidersFailed {
            attempted: attempted.join(", "),
        })
    }

    /// Estimated token count and dollar cost for a prospective call, priced
    /// by the provider that would be attempted first. Usable for boundary
    /// quota checks without touching the network.
    pub fn estimate_cost(&self, prompt: &str, options: &GenerationOptions) -> Option<(u64, f64)> {
        let first = self.attempt_order(options).into_iter().next()?;
        let tokens = first.estimate_tokens(prompt) + u64::from(options.max_tokens);
        Some((tokens, first.estimate_cost(tokens, options)))
    }

    /// Attempt order for one call: preferred provider first when it is
    /// registered, then the remaining providers in configured order.
    fn attempt_order(&self, options: &GenerationOptions) -> Vec<Arc<dyn TextProvider>> {
        let mut order: Vec<Arc<dyn TextProvider>> = Vec::with_capacity(self.providers.len());

        if let Some(preferred) = &options.preferred_provider {
            if let Some(p) = self.providers.iter().find(|p| p.name() == preferred.as_str()) {
                order.push(Arc::clone(p));
            }
        }

        for provider in &self.providers {
            if order.iter().all(|p| p.name() != provider.name()) {
                order.push(Arc::clone(provider));
            }
        }

        order
    }
}
