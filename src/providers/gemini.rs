//! Gemini-shaped generateContent backend.

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
        "gemini-1.5-flash-8b" => 0.0001,
        "gemini-1.5-flash" => 0.0003,
        "gemini-1.5-pro" => 0.0025,
        _ => 0.0003,
    }
}

fn tier_model(priority: CostPriority) -> &'static str {
    match priority {
        CostPriority::Fast => "gemini-1.5-flash-8b",
        CostPriority::Balanced => "gemini-1.5-flash",
        CostPriority::Quality => "gemini-1.5-pro",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

/// Client for a Gemini-compatible generateContent API.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl GeminiProvider {
    /// Create a new Gemini provider
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
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        let model = self.resolve_model(options);
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        debug!(model = %model, prompt_chars = prompt.len(), "Calling Gemini generateContent");

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: options.max_tokens,
                temperature: options.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
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

        let generated: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "Response contained no candidates".to_string(),
            })?;

        let tokens_used = generated
            .usage_metadata
            .and_then(|u| u.total_token_count)
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
