//! Integration tests for the provider gateway and concrete backends.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storyweave::config::RequestConfig;
use storyweave::error::{ProviderError, ProviderResult};
use storyweave::providers::{
    estimate_tokens, AnthropicProvider, GenerationOptions, GenerationResult, OpenAiProvider,
    ProviderGateway, TextProvider,
};

/// Scripted in-process provider counting its attempts.
struct ScriptedProvider {
    name: &'static str,
    fail: bool,
    calls: AtomicU32,
}

impl ScriptedProvider {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            });
        }
        Ok(GenerationResult {
            text: format!("response from {}", self.name),
            tokens_used: estimate_tokens(prompt),
            cost: 0.001,
            provider: self.name.to_string(),
            model: "scripted-1".to_string(),
        })
    }

    fn estimate_cost(&self, tokens: u64, _options: &GenerationOptions) -> f64 {
        tokens as f64 * 0.000001
    }
}

#[tokio::test]
async fn test_preferred_fails_fallback_succeeds() {
    let preferred = ScriptedProvider::new("alpha", true);
    let fallback = ScriptedProvider::new("beta", false);
    let gateway = ProviderGateway::new(
        vec![
            preferred.clone() as Arc<dyn TextProvider>,
            fallback.clone(),
        ],
        &RequestConfig::default(),
    );

    let options = GenerationOptions::default().with_preferred_provider("alpha");
    let result = gateway.generate_text("draft a scene", &options).await.unwrap();

    assert_eq!(result.provider, "beta");
    assert_eq!(preferred.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_three_failing_providers_each_attempted_once() {
    let a = ScriptedProvider::new("a", true);
    let b = ScriptedProvider::new("b", true);
    let c = ScriptedProvider::new("c", true);
    let gateway = ProviderGateway::new(
        vec![a.clone() as Arc<dyn TextProvider>, b.clone(), c.clone()],
        &RequestConfig::default(),
    );

    let err = gateway
        .generate_text("draft a scene", &GenerationOptions::default())
        .await
        .unwrap_err();

    match err {
        ProviderError::AllProvidersFailed { attempted } => {
            assert_eq!(attempted, "a, b, c");
        }
        other => panic!("Expected AllProvidersFailed, got {:?}", other),
    }
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 1);
}

#[tokio::test]
async fn test_openai_provider_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Once upon a time."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18}
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAiProvider::new("test-key", server.uri(), &RequestConfig::default()).unwrap();
    let result = provider
        .generate("Start a story", &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.text, "Once upon a time.");
    assert_eq!(result.tokens_used, 18);
    assert_eq!(result.provider, "openai");
    assert_eq!(result.model, "gpt-4o");
    assert!(result.cost > 0.0);
}

#[tokio::test]
async fn test_openai_provider_estimates_when_usage_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Generated text here."}}]
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAiProvider::new("test-key", server.uri(), &RequestConfig::default()).unwrap();
    let prompt = "Continue the chapter";
    let result = provider
        .generate(prompt, &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(
        result.tokens_used,
        estimate_tokens(prompt) + estimate_tokens("Generated text here.")
    );
}

#[tokio::test]
async fn test_openai_provider_surfaces_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider =
        OpenAiProvider::new("test-key", server.uri(), &RequestConfig::default()).unwrap();
    let err = provider
        .generate("prompt", &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Api { status: 429, .. }));
}

#[tokio::test]
async fn test_anthropic_provider_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "The detective lit a cigarette."}],
            "usage": {"input_tokens": 20, "output_tokens": 8}
        })))
        .mount(&server)
        .await;

    let provider =
        AnthropicProvider::new("test-key", server.uri(), &RequestConfig::default()).unwrap();
    let result = provider
        .generate("Open the scene", &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.text, "The detective lit a cigarette.");
    assert_eq!(result.tokens_used, 28);
    assert_eq!(result.provider, "anthropic");
}

#[tokio::test]
async fn test_gateway_falls_back_from_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let openai =
        Arc::new(OpenAiProvider::new("test-key", server.uri(), &RequestConfig::default()).unwrap());
    let fallback = ScriptedProvider::new("scripted", false);
    let gateway = ProviderGateway::new(
        vec![openai as Arc<dyn TextProvider>, fallback.clone()],
        &RequestConfig::default(),
    );

    let result = gateway
        .generate_text("draft", &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.provider, "scripted");
    assert_eq!(fallback.calls(), 1);
}
