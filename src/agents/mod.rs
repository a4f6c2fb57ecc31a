//! Agent definitions and the process-wide registry.
//!
//! Agent definition files are Markdown documents with one fenced structured
//! block describing the agent's identity, persona, commands, and dependency
//! resources. The registry is populated once at startup from a directory scan
//! and never mutated afterwards.

mod block;
mod loader;

pub use block::{extract_fenced_block, parse_block, BlockSection, ParsedBlock};
pub use loader::load_directory;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Category of a dependency resource referenced by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Reference data files (genre guides, style sheets).
    Data,
    /// Task descriptions the agent can be pointed at.
    Tasks,
    /// Output templates.
    Templates,
    /// Shared utility snippets.
    Utils,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyKind::Data => write!(f, "data"),
            DependencyKind::Tasks => write!(f, "tasks"),
            DependencyKind::Templates => write!(f, "templates"),
            DependencyKind::Utils => write!(f, "utils"),
        }
    }
}

impl std::str::FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "data" => Ok(DependencyKind::Data),
            "tasks" => Ok(DependencyKind::Tasks),
            "templates" => Ok(DependencyKind::Templates),
            "utils" => Ok(DependencyKind::Utils),
            _ => Err(format!("Unknown dependency kind: {}", s)),
        }
    }
}

/// Persona fields driving prompt composition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Persona {
    /// What the agent is, in one sentence.
    pub role: String,
    /// Voice and tone the agent writes in.
    pub style: String,
    /// Ordered working principles, rendered into every prompt.
    pub core_principles: Vec<String>,
}

/// A loaded agent definition. Immutable once in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Stable identifier, unique within the registry.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short role title.
    pub title: String,
    /// Persona driving prompt composition.
    pub persona: Persona,
    /// Command name to human description.
    pub commands: BTreeMap<String, String>,
    /// Dependency category to referenced resource names.
    pub dependencies: BTreeMap<DependencyKind, Vec<String>>,
}

impl AgentDefinition {
    /// Build a definition from a parsed block, using `fallback_id` when the
    /// block has no `id` field. Missing fields degrade to empty defaults.
    pub fn from_block(block: &ParsedBlock, fallback_id: &str) -> Self {
        let id = block
            .scalar("agent", "id")
            .unwrap_or(fallback_id)
            .to_string();
        let name = block.scalar("agent", "name").unwrap_or(&id).to_string();
        let title = block.scalar("agent", "title").unwrap_or_default().to_string();

        let persona = Persona {
            role: block.scalar("persona", "role").unwrap_or_default().to_string(),
            style: block.scalar("persona", "style").unwrap_or_default().to_string(),
            core_principles: block
                .list("persona", "core_principles")
                .unwrap_or_default()
                .to_vec(),
        };

        let commands = block
            .sections
            .get("commands")
            .map(|s| s.scalars.clone())
            .unwrap_or_default();

        let mut dependencies = BTreeMap::new();
        if let Some(section) = block.sections.get("dependencies") {
            for (category, names) in &section.lists {
                match category.parse::<DependencyKind>() {
                    Ok(kind) => {
                        dependencies.insert(kind, names.clone());
                    }
                    Err(_) => {
                        tracing::debug!(category = %category, "Skipping unknown dependency category");
                    }
                }
            }
        }

        Self {
            id,
            name,
            title,
            persona,
            commands,
            dependencies,
        }
    }
}

/// Registry of agent definitions keyed by id, in load order.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentDefinition>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a directory of agent definition files.
    ///
    /// A single malformed file is logged and skipped; only an unreadable
    /// directory fails the load.
    pub fn load(dir: &std::path::Path) -> Result<Self, AgentError> {
        load_directory(dir)
    }

    /// Register a definition. The first definition wins on id collision.
    pub fn insert(&mut self, agent: AgentDefinition) {
        if self.index.contains_key(&agent.id) {
            tracing::warn!(agent_id = %agent.id, "Duplicate agent id, keeping earlier definition");
            return;
        }
        self.index.insert(agent.id.clone(), self.agents.len());
        self.agents.push(agent);
    }

    /// Get an agent by id.
    pub fn get(&self, id: &str) -> Option<&AgentDefinition> {
        self.index.get(id).map(|&i| &self.agents[i])
    }

    /// All agents in registry order.
    pub fn agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_from(body: &str) -> ParsedBlock {
        parse_block(body)
    }

    #[test]
    fn test_definition_from_full_block() {
        let block = block_from(
            "agent:\n  id: muse\n  name: Muse\n  title: Idea Generator\n\
             persona:\n  role: Brainstorming partner\n  style: Playful\n  core_principles:\n    - Quantity breeds quality\n\
             commands:\n  pitch: Pitch three premises\n\
             dependencies:\n  data:\n    - tropes\n",
        );
        let def = AgentDefinition::from_block(&block, "fallback");
        assert_eq!(def.id, "muse");
        assert_eq!(def.name, "Muse");
        assert_eq!(def.title, "Idea Generator");
        assert_eq!(def.persona.core_principles, ["Quantity breeds quality"]);
        assert_eq!(def.commands.get("pitch").unwrap(), "Pitch three premises");
        assert_eq!(
            def.dependencies.get(&DependencyKind::Data).unwrap(),
            &vec!["tropes".to_string()]
        );
    }

    #[test]
    fn test_definition_id_fallback() {
        let block = block_from("persona:\n  role: Editor\n");
        let def = AgentDefinition::from_block(&block, "line-editor");
        assert_eq!(def.id, "line-editor");
        assert_eq!(def.name, "line-editor");
        assert!(def.title.is_empty());
    }

    #[test]
    fn test_definition_unknown_dependency_category_skipped() {
        let block = block_from("agent:\n  id: a\ndependencies:\n  widgets:\n    - x\n");
        let def = AgentDefinition::from_block(&block, "a");
        assert!(def.dependencies.is_empty());
    }

    #[test]
    fn test_registry_insert_and_get() {
        let mut registry = AgentRegistry::new();
        let block = block_from("agent:\n  id: muse\n");
        registry.insert(AgentDefinition::from_block(&block, "muse"));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("muse").is_some());
        assert!(registry.get("nobody").is_none());
    }

    #[test]
    fn test_registry_duplicate_keeps_first() {
        let mut registry = AgentRegistry::new();
        let mut first = AgentDefinition::from_block(&block_from("agent:\n  id: dup\n"), "dup");
        first.title = "first".to_string();
        let mut second = AgentDefinition::from_block(&block_from("agent:\n  id: dup\n"), "dup");
        second.title = "second".to_string();

        registry.insert(first);
        registry.insert(second);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().title, "first");
    }

    #[test]
    fn test_registry_preserves_order() {
        let mut registry = AgentRegistry::new();
        for id in ["alpha", "omega", "mid"] {
            let block = block_from(&format!("agent:\n  id: {}\n", id));
            registry.insert(AgentDefinition::from_block(&block, id));
        }
        let ids: Vec<_> = registry.agents().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["alpha", "omega", "mid"]);
    }

    #[test]
    fn test_dependency_kind_round_trip() {
        for kind in [
            DependencyKind::Data,
            DependencyKind::Tasks,
            DependencyKind::Templates,
            DependencyKind::Utils,
        ] {
            let parsed: DependencyKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("widgets".parse::<DependencyKind>().is_err());
    }
}
