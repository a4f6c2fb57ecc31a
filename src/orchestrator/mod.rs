//! Orchestration service: executes one agent action end to end.
//!
//! Resolves the agent, checks its declared dependency resources (missing ones
//! warn, never abort), composes the prompt, invokes the provider gateway, and
//! wraps the result as an [`AgentSession`].

mod prompt;

pub use prompt::compose_prompt;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agents::AgentRegistry;
use crate::error::{AgentError, AppResult};
use crate::providers::{GenerationOptions, ProviderGateway};
use crate::resources::ResourceBackend;

/// Sentinel user id for sessions without an authenticated caller.
pub const ANONYMOUS_USER: &str = "anonymous";
/// Sentinel project id for sessions outside any project.
pub const DEFAULT_PROJECT: &str = "default";
/// Sentinel story-file id for sessions not tied to a stored document.
pub const DEFAULT_STORY_FILE: &str = "default";

/// Caller-supplied inputs for one agent action.
///
/// The identity fields are optional; free-form fields are kept in key order
/// so prompt rendering stays deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionInputs {
    /// Calling user, when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Owning project, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Target story file, when the action edits a stored document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_file_id: Option<String>,
    /// Free-form key/value inputs rendered into the prompt.
    pub fields: BTreeMap<String, String>,
}

impl ActionInputs {
    /// Create empty inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the calling user id
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the project id
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the story file id
    pub fn with_story_file(mut self, story_file_id: impl Into<String>) -> Self {
        self.story_file_id = Some(story_file_id.into());
        self
    }

    /// Add a free-form input field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Output of an agent action. `response` is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutput {
    /// Generated response text.
    pub response: String,
}

/// Provider usage captured for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Provider that served the call.
    pub provider: String,
    /// Concrete model used.
    pub model: String,
    /// Tokens consumed.
    pub tokens_used: u64,
    /// Estimated dollar cost.
    pub cost: f64,
    /// Wall-clock latency of the gateway call.
    pub latency_ms: u64,
}

/// One recorded invocation of an agent action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    /// Unique session identifier.
    pub id: String,
    /// Agent that served the action.
    pub agent_id: String,
    /// Calling user, or [`ANONYMOUS_USER`].
    pub user_id: String,
    /// Owning project, or [`DEFAULT_PROJECT`].
    pub project_id: String,
    /// Target story file, or [`DEFAULT_STORY_FILE`].
    pub story_file_id: String,
    /// Inputs as supplied by the caller.
    pub inputs: ActionInputs,
    /// Action outputs.
    pub output: SessionOutput,
    /// Provider usage metadata.
    pub usage: UsageMetadata,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated; equals `created_at` on creation.
    pub updated_at: DateTime<Utc>,
}

/// Executes agent actions against the registry, resources, and gateway.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    gateway: Arc<ProviderGateway>,
    resources: Arc<dyn ResourceBackend>,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        registry: Arc<AgentRegistry>,
        gateway: Arc<ProviderGateway>,
        resources: Arc<dyn ResourceBackend>,
    ) -> Self {
        Self {
            registry,
            gateway,
            resources,
        }
    }

    /// Execute one agent action and return the recorded session.
    ///
    /// Fails with [`AgentError::NotFound`] for an unknown agent and with a
    /// provider error only when every backend in the fallback chain failed.
    /// Missing dependency resources are warnings, not failures.
    pub async fn execute_agent_action(
        &self,
        agent_id: &str,
        action: &str,
        inputs: ActionInputs,
        document_content: &str,
        options: &GenerationOptions,
    ) -> AppResult<AgentSession> {
        let start = Instant::now();

        let agent = self.registry.get(agent_id).ok_or_else(|| AgentError::NotFound {
            agent_id: agent_id.to_string(),
        })?;

        for (kind, names) in &agent.dependencies {
            for name in names {
                if !self.resources.exists(*kind, name).await {
                    warn!(
                        agent_id = %agent.id,
                        category = %kind,
                        resource = %name,
                        "Declared dependency resource not found"
                    );
                }
            }
        }

        let prompt = compose_prompt(agent, action, document_content, &inputs);
        debug!(agent_id = %agent.id, prompt_chars = prompt.len(), "Composed agent prompt");

        let result = self.gateway.generate_text(&prompt, options).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let now = Utc::now();
        let session = AgentSession {
            id: Uuid::new_v4().to_string(),
            agent_id: agent.id.clone(),
            user_id: inputs
                .user_id
                .clone()
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            project_id: inputs
                .project_id
                .clone()
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            story_file_id: inputs
                .story_file_id
                .clone()
                .unwrap_or_else(|| DEFAULT_STORY_FILE.to_string()),
            inputs,
            output: SessionOutput {
                response: result.text,
            },
            usage: UsageMetadata {
                provider: result.provider,
                model: result.model,
                tokens_used: result.tokens_used,
                cost: result.cost,
                latency_ms,
            },
            created_at: now,
            updated_at: now,
        };

        info!(
            session_id = %session.id,
            agent_id = %session.agent_id,
            provider = %session.usage.provider,
            tokens = session.usage.tokens_used,
            latency_ms = latency_ms,
            "Agent action completed"
        );

        Ok(session)
    }
}
