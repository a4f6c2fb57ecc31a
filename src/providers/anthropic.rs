//! Anthropic-shaped messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{estimate_tokens, CostPriority, GenerationOptions, GenerationResult, TextProvider};
use crate::config::RequestConfig;
use crate::error::{ProviderError, ProviderResult};

const API_VERSION: &str = "2023-06-01";

/// Approximate blended price per 1K tokens, by model.
fn price_per_1k(model: &str) -> f64 {
    match model {
        "claude-3-5-haiku-latest" => 0.001,
        "claude-3-5-sonnet-latest" => 0.003,
        "claude-3-opus-latest" => 0.015,
        _ => 0.003,
    }
}

fn tier_model(priority: CostPriority) -> &'static str {
    match priority {
        CostPriority::Fast => "claude-3-5-haiku-latest",
        CostPriority::Balanced => "claude-3-5-sonnet-latest",
        CostPriority::Quality => "claude-3-opus-latest",
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<RequestMessage>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    usage: Option<MessageUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct MessageUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

/// Client for an Anthropic-compatible messages API.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        request_config: &RequestConfig,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    fn resolve_model(&self, options: &GenerationOptions) -> String {
        options
            .model
            .clone()
            .unwrap_or_else(|| tier_model(options.cost_priority).to_string())
    }
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        let url = format!("{}/v1/messages", self.base_url);
        let model = self.resolve_model(options);

        debug!(model = %model, prompt_chars = prompt.len(), "Calling Anthropic messages API");

        let request = MessageRequest {
            model: model.clone(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let message: MessageResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        let text = message
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse {
                message: "Response contained no text content".to_string(),
            });
        }

        let tokens_used = message
            .usage
            .and_then(|u| match (u.input_tokens, u.output_tokens) {
                (Some(i), Some(o)) => Some(i + o),
                (Some(i), None) => Some(i),
                (None, Some(o)) => Some(o),
                (None, None) => None,
            })
            .unwrap_or_else(|| estimate_tokens(prompt) + estimate_tokens(&text));

        Ok(GenerationResult {
            cost: tokens_used as f64 / 1000.0 * price_per_1k(&model),
            text,
            tokens_used,
            provider: self.name().to_string(),
            model,
        })
    }

    fn estimate_cost(&self, tokens: u64, options: &GenerationOptions) -> f64 {
        tokens as f64 / 1000.0 * price_per_1k(&self.resolve_model(options))
    }
}
