use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub agents: AgentDirConfig,
    pub providers: ProviderConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
}

/// Agent definition and resource directory configuration
#[derive(Debug, Clone)]
pub struct AgentDirConfig {
    pub agents_dir: PathBuf,
    pub resources_dir: PathBuf,
}

/// Backend credentials and fallback ordering for the provider gateway
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    /// Provider names in fallback order, first tried first.
    pub fallback_order: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Outbound request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-provider-attempt cap; a timed-out provider falls through to the next.
    pub timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let agents = AgentDirConfig {
            agents_dir: PathBuf::from(
                env::var("AGENTS_DIR").unwrap_or_else(|_| "./agents".to_string()),
            ),
            resources_dir: PathBuf::from(
                env::var("RESOURCES_DIR").unwrap_or_else(|_| "./resources".to_string()),
            ),
        };

        let fallback_order: Vec<String> = env::var("PROVIDER_FALLBACK_ORDER")
            .unwrap_or_else(|_| "openai,anthropic,gemini".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if fallback_order.is_empty() {
            return Err(AppError::Config {
                message: "PROVIDER_FALLBACK_ORDER must name at least one provider".to_string(),
            });
        }

        let providers = ProviderConfig {
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            fallback_order,
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        Ok(Config {
            agents,
            providers,
            logging,
            request,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}
