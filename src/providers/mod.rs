//! Text-generation providers and the fallback gateway.
//!
//! Every backend implements [`TextProvider`]; the [`ProviderGateway`] owns an
//! ordered list of them and substitutes the next provider when one fails.
//! Which providers exist is configuration data, not code.

mod anthropic;
mod gateway;
mod gemini;
mod openai;

pub use anthropic::AnthropicProvider;
pub use gateway::ProviderGateway;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

/// Cost/quality trade-off selecting a concrete model tier per provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostPriority {
    /// Cheapest tier, for drafts and bulk work.
    Fast,
    /// Default tier.
    #[default]
    Balanced,
    /// Strongest tier, for final passes.
    Quality,
}

impl std::fmt::Display for CostPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostPriority::Fast => write!(f, "fast"),
            CostPriority::Balanced => write!(f, "balanced"),
            CostPriority::Quality => write!(f, "quality"),
        }
    }
}

impl std::str::FromStr for CostPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(CostPriority::Fast),
            "balanced" => Ok(CostPriority::Balanced),
            "quality" => Ok(CostPriority::Quality),
            _ => Err(format!("Unknown cost priority: {}", s)),
        }
    }
}

/// Options for a single generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Explicit model override; bypasses the cost-priority tier mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Model tier to use when no explicit model is given.
    pub cost_priority: CostPriority,
    /// Provider to try first, ahead of the configured fallback order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            model: None,
            cost_priority: CostPriority::default(),
            preferred_provider: None,
        }
    }
}

impl GenerationOptions {
    /// Set the completion token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set an explicit model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the cost priority tier
    pub fn with_cost_priority(mut self, priority: CostPriority) -> Self {
        self.cost_priority = priority;
        self
    }

    /// Set the provider to try first
    pub fn with_preferred_provider(mut self, name: impl Into<String>) -> Self {
        self.preferred_provider = Some(name.into());
        self
    }
}

/// Result of a successful generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated text.
    pub text: String,
    /// Tokens consumed, as reported by the backend or estimated.
    pub tokens_used: u64,
    /// Estimated dollar cost for the call.
    pub cost: f64,
    /// Name of the provider that served the call.
    pub provider: String,
    /// Concrete model used.
    pub model: String,
}

/// Uniform interface over text-generation backends.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Stable provider name used in fallback ordering and session metadata.
    fn name(&self) -> &str;

    /// Generate text for a prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult>;

    /// Cheap token estimate usable without a network call.
    fn estimate_tokens(&self, text: &str) -> u64 {
        estimate_tokens(text)
    }

    /// Estimated dollar cost for a call of `tokens` at the options' tier.
    fn estimate_cost(&self, tokens: u64, options: &GenerationOptions) -> f64;
}

/// Heuristic token count: character count divided by four.
///
/// Used both for pre-call estimates and as the post-call figure when a
/// backend response carries no usage data, so the two always agree.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}
