//! End-to-end orchestration tests: registry -> orchestrator -> gateway,
//! with the resulting session feeding the document store and usage monitor.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use async_trait::async_trait;

use storyweave::agents::AgentRegistry;
use storyweave::config::RequestConfig;
use storyweave::error::{AppError, ProviderError, ProviderResult};
use storyweave::metrics::UsageMonitor;
use storyweave::orchestrator::{ActionInputs, Orchestrator};
use storyweave::providers::{
    GenerationOptions, GenerationResult, ProviderGateway, TextProvider,
};
use storyweave::resources::FsResources;
use storyweave::store::DocumentStore;

const AGENT_FILE: &str = r#"# Muse

```yaml
agent:
  id: muse
  name: Muse
  title: Idea Generator
persona:
  role: Brainstorming partner
  style: Playful and vivid
  core_principles:
    - Quantity breeds quality
commands:
  pitch: Pitch three premises
dependencies:
  data:
    - tropes.md
```
"#;

/// Provider returning a canned continuation.
struct CannedProvider;

#[async_trait]
impl TextProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        Ok(GenerationResult {
            text: "It was a dark and stormy night.\nThe muse arrived late.".to_string(),
            tokens_used: 64,
            cost: 0.0008,
            provider: "canned".to_string(),
            model: "canned-1".to_string(),
        })
    }

    fn estimate_cost(&self, tokens: u64, _options: &GenerationOptions) -> f64 {
        tokens as f64 * 0.0000125
    }
}

struct DownProvider;

#[async_trait]
impl TextProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        Err(ProviderError::Api {
            status: 500,
            message: "down".to_string(),
        })
    }

    fn estimate_cost(&self, _tokens: u64, _options: &GenerationOptions) -> f64 {
        0.0
    }
}

struct Fixture {
    orchestrator: Orchestrator,
    _agents_dir: tempfile::TempDir,
    _resources_dir: tempfile::TempDir,
}

fn fixture(provider: Arc<dyn TextProvider>) -> Fixture {
    let agents_dir = tempfile::tempdir().unwrap();
    fs::write(agents_dir.path().join("muse.md"), AGENT_FILE).unwrap();

    let resources_dir = tempfile::tempdir().unwrap();
    let data_dir = resources_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("tropes.md"), "# Tropes\n").unwrap();

    let registry = Arc::new(AgentRegistry::load(agents_dir.path()).unwrap());
    let gateway = Arc::new(ProviderGateway::new(
        vec![provider],
        &RequestConfig::default(),
    ));
    let resources = Arc::new(FsResources::new(resources_dir.path()));

    Fixture {
        orchestrator: Orchestrator::new(registry, gateway, resources),
        _agents_dir: agents_dir,
        _resources_dir: resources_dir,
    }
}

#[tokio::test]
async fn test_full_flow_session_into_store_and_monitor() {
    let fixture = fixture(Arc::new(CannedProvider));
    let store = DocumentStore::new();
    let monitor = UsageMonitor::new();

    let document = store.create("proj-1", "chapter-1.md", "", BTreeMap::new(), "ada");

    let inputs = ActionInputs::new()
        .with_user("ada")
        .with_project("proj-1")
        .with_story_file(&document.id)
        .with_field("genre", "noir");

    let session = fixture
        .orchestrator
        .execute_agent_action(
            "muse",
            "Open the first chapter",
            inputs,
            &document.content,
            &GenerationOptions::default(),
        )
        .await
        .unwrap();

    // Caller persists the generated content and feeds the monitor.
    let updated = store
        .update(
            &document.id,
            &session.output.response,
            Some("Muse: open the first chapter"),
            &session.user_id,
            BTreeMap::new(),
        )
        .unwrap();
    monitor.record(&session);

    assert_eq!(session.agent_id, "muse");
    assert_eq!(session.user_id, "ada");
    assert_eq!(session.story_file_id, document.id);
    assert_eq!(updated.version, 2);
    assert_eq!(updated.content, session.output.response);

    let metrics = monitor.global_metrics();
    assert_eq!(metrics.total_tokens, 64);
    assert_eq!(metrics.active_users, 1);
    assert_eq!(metrics.top_agents[0].agent_id, "muse");
}

#[tokio::test]
async fn test_unknown_agent_fails_before_gateway() {
    let fixture = fixture(Arc::new(CannedProvider));

    let err = fixture
        .orchestrator
        .execute_agent_action(
            "nobody",
            "act",
            ActionInputs::new(),
            "",
            &GenerationOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Agent(_)));
}

#[tokio::test]
async fn test_gateway_failure_recorded_as_monitor_failure() {
    let fixture = fixture(Arc::new(DownProvider));
    let monitor = UsageMonitor::new();

    let result = fixture
        .orchestrator
        .execute_agent_action(
            "muse",
            "Open the first chapter",
            ActionInputs::new(),
            "",
            &GenerationOptions::default(),
        )
        .await;

    assert!(result.is_err());
    monitor.record_failure("muse");

    let metrics = monitor.global_metrics();
    assert_eq!(metrics.error_rate, 100.0);
    assert_eq!(metrics.window_sessions, 0);
}

#[tokio::test]
async fn test_missing_resource_does_not_block_action() {
    let agents_dir = tempfile::tempdir().unwrap();
    fs::write(agents_dir.path().join("muse.md"), AGENT_FILE).unwrap();
    // Resource dir exists but holds no data/tropes.md.
    let resources_dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(AgentRegistry::load(agents_dir.path()).unwrap());
    let gateway = Arc::new(ProviderGateway::new(
        vec![Arc::new(CannedProvider)],
        &RequestConfig::default(),
    ));
    let orchestrator = Orchestrator::new(
        registry,
        gateway,
        Arc::new(FsResources::new(resources_dir.path())),
    );

    let session = orchestrator
        .execute_agent_action(
            "muse",
            "Pitch something",
            ActionInputs::new(),
            "",
            &GenerationOptions::default(),
        )
        .await;

    assert!(session.is_ok());
}
