//! Prompt composition.
//!
//! `compose_prompt` is a pure function of its arguments: the same agent,
//! action, document, and inputs always produce the same prompt text. Input
//! fields render in key order, so callers get reproducible sessions modulo
//! provider non-determinism.

use super::ActionInputs;
use crate::agents::AgentDefinition;

/// Render the natural-language instruction for one agent action.
pub fn compose_prompt(
    agent: &AgentDefinition,
    action: &str,
    document_content: &str,
    inputs: &ActionInputs,
) -> String {
    let mut prompt = String::new();

    if agent.title.is_empty() {
        prompt.push_str(&format!("You are {}.\n", agent.name));
    } else {
        prompt.push_str(&format!("You are {}, {}.\n", agent.name, agent.title));
    }

    if !agent.persona.role.is_empty() {
        prompt.push_str(&format!("Role: {}\n", agent.persona.role));
    }
    if !agent.persona.style.is_empty() {
        prompt.push_str(&format!("Style: {}\n", agent.persona.style));
    }
    if !agent.persona.core_principles.is_empty() {
        prompt.push_str("Core principles:\n");
        for (i, principle) in agent.persona.core_principles.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, principle));
        }
    }

    prompt.push_str("\n## Task\n\n");
    prompt.push_str(action);
    prompt.push('\n');

    prompt.push_str("\n## Current document\n\n");
    if document_content.is_empty() {
        prompt.push_str("(the document is empty)\n");
    } else {
        prompt.push_str(document_content);
        if !document_content.ends_with('\n') {
            prompt.push('\n');
        }
    }

    if !inputs.fields.is_empty() {
        prompt.push_str("\n## Inputs\n\n");
        for (key, value) in &inputs.fields {
            prompt.push_str(&format!("- {}: {}\n", key, value));
        }
    }

    prompt.push_str("\nRespond with the complete text produced by this action.\n");
    prompt
}
