//! # Storyweave
//!
//! Engine core for a collaborative story-drafting product: scripted agent
//! personas draft and revise versioned story documents through a uniform,
//! fallback-capable gateway over external text-generation backends.
//!
//! ## Features
//!
//! - **Agent Registry**: agent personas loaded from Markdown definition files
//!   with an embedded structured block
//! - **Provider Gateway**: ordered fallback across OpenAI-, Anthropic-, and
//!   Gemini-shaped backends with per-attempt timeouts and cost estimation
//! - **Orchestration**: deterministic prompt composition and session capture
//!   for every agent action
//! - **Version Store**: append-only document history with revert and
//!   positional line diff
//! - **Usage Monitor**: rolling 24h metrics, lifetime error rate, and a
//!   tri-state health status
//! - **Auth/Billing stubs**: in-memory mock of the account collaborators
//!
//! ## Architecture
//!
//! ```text
//! Caller → Orchestrator → Provider Gateway → LLM backends (HTTP)
//!              ↓                                   ↓
//!        Agent Registry                     AgentSession
//!              ↓                                   ↓
//!       Document Store  ←──── content ────  Usage Monitor
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use storyweave::{AgentRegistry, Config, FsResources, Orchestrator, ProviderGateway};
//! use storyweave::providers::GenerationOptions;
//! use storyweave::orchestrator::ActionInputs;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let registry = Arc::new(AgentRegistry::load(&config.agents.agents_dir)?);
//!     let gateway = Arc::new(ProviderGateway::from_config(&config)?);
//!     let resources = Arc::new(FsResources::new(&config.agents.resources_dir));
//!     let orchestrator = Orchestrator::new(registry, gateway, resources);
//!
//!     let session = orchestrator
//!         .execute_agent_action(
//!             "plot-architect",
//!             "Outline the next chapter",
//!             ActionInputs::new().with_field("genre", "noir"),
//!             "It was a dark and stormy night.",
//!             &GenerationOptions::default(),
//!         )
//!         .await?;
//!     println!("{}", session.output.response);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Agent definitions, the structured-block parser, and the registry.
pub mod agents;
/// In-memory auth and billing stubs.
pub mod auth;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Usage monitoring and system health.
pub mod metrics;
/// Agent action orchestration and session records.
pub mod orchestrator;
/// Text-generation providers and the fallback gateway.
pub mod providers;
/// Dependency resource backend.
pub mod resources;
/// Versioned document store.
pub mod store;

pub use agents::{AgentDefinition, AgentRegistry};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use metrics::UsageMonitor;
pub use orchestrator::{AgentSession, Orchestrator};
pub use providers::ProviderGateway;
pub use resources::FsResources;
pub use store::DocumentStore;
