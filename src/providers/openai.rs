//! OpenAI-shaped chat completion backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{estimate_tokens, CostPriority, GenerationOptions, GenerationResult, TextProvider};
use crate::config::RequestConfig;
use crate::error::{ProviderError, ProviderResult};

/// Approximate blended price per 1K tokens, by model.
fn price_per_1k(model: &str) -> f64 {
    match model {
        "gpt-4o-mini" => 0.0006,
        "gpt-4o" => 0.0125,
        "gpt-4-turbo" => 0.03,
        _ => 0.0125,
    }
}

fn tier_model(priority: CostPriority) -> &'static str {
    match priority {
        CostPriority::Fast => "gpt-4o-mini",
        CostPriority::Balanced => "gpt-4o",
        CostPriority::Quality => "gpt-4-turbo",
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

/// Client for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
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
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let model = self.resolve_model(options);

        debug!(model = %model, prompt_chars = prompt.len(), "Calling OpenAI chat completions");

        let request = ChatRequest {
            model: model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        let text = chat
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "Response contained no choices".to_string(),
            })?;

        let tokens_used = chat
            .usage
            .and_then(|u| u.total_tokens)
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
