use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storyweave::{
    agents::AgentRegistry,
    config::Config,
    orchestrator::{ActionInputs, Orchestrator},
    providers::{CostPriority, GenerationOptions, ProviderGateway},
    resources::FsResources,
};

#[derive(Parser)]
#[command(name = "storyweave", version, about = "Story-drafting agent engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the loaded agent definitions
    ListAgents,
    /// Run one agent action against a document
    Run {
        /// Agent id to invoke
        #[arg(long)]
        agent: String,
        /// Action description for the agent
        #[arg(long)]
        action: String,
        /// Path to the current document content
        #[arg(long)]
        document: Option<PathBuf>,
        /// Free-form input as key=value (repeatable)
        #[arg(long = "input", value_parser = parse_key_val)]
        inputs: Vec<(String, String)>,
        /// Provider to try first
        #[arg(long)]
        preferred: Option<String>,
        /// Model tier: fast, balanced, or quality
        #[arg(long, default_value = "balanced")]
        tier: CostPriority,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    // Load the agent registry
    let registry = match AgentRegistry::load(&config.agents.agents_dir) {
        Ok(r) => {
            info!(agents = r.len(), "Agent registry ready");
            Arc::new(r)
        }
        Err(e) => {
            error!(error = %e, "Failed to load agent registry");
            return Err(e.into());
        }
    };

    match cli.command {
        Command::ListAgents => {
            for agent in registry.agents() {
                println!("{:<20} {:<24} {}", agent.id, agent.name, agent.title);
                for (command, description) in &agent.commands {
                    println!("  *{:<18} {}", command, description);
                }
            }
        }
        Command::Run {
            agent,
            action,
            document,
            inputs,
            preferred,
            tier,
        } => {
            let gateway = match ProviderGateway::from_config(&config) {
                Ok(g) => {
                    info!(providers = ?g.provider_names(), "Provider gateway ready");
                    Arc::new(g)
                }
                Err(e) => {
                    error!(error = %e, "Failed to build provider gateway");
                    return Err(e.into());
                }
            };
            let resources = Arc::new(FsResources::new(&config.agents.resources_dir));
            let orchestrator = Orchestrator::new(registry, gateway, resources);

            let document_content = match &document {
                Some(path) => std::fs::read_to_string(path)?,
                None => String::new(),
            };

            let mut action_inputs = ActionInputs::new();
            for (key, value) in inputs {
                action_inputs = action_inputs.with_field(key, value);
            }

            let mut options = GenerationOptions::default().with_cost_priority(tier);
            if let Some(name) = preferred {
                options = options.with_preferred_provider(name);
            }

            let session = orchestrator
                .execute_agent_action(&agent, &action, action_inputs, &document_content, &options)
                .await?;

            println!("{}", session.output.response);
            eprintln!(
                "session {} | {}/{} | {} tokens | ${:.4} | {}ms",
                session.id,
                session.usage.provider,
                session.usage.model,
                session.usage.tokens_used,
                session.usage.cost,
                session.usage.latency_ms
            );
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        storyweave::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        storyweave::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
