//! Directory loader for agent definition files.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::block::{extract_fenced_block, parse_block};
use super::{AgentDefinition, AgentRegistry};
use crate::error::AgentError;

/// Scan `dir` for `.md` agent definition files and build a registry.
///
/// Files are visited in sorted filename order so registry order is stable
/// across platforms. A file that cannot be read or has no tagged fenced block
/// is logged and skipped; the load continues with the rest.
pub fn load_directory(dir: &Path) -> Result<AgentRegistry, AgentError> {
    let entries = fs::read_dir(dir).map_err(|e| AgentError::Directory {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut registry = AgentRegistry::new();

    for path in &paths {
        let document = match fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable agent file");
                continue;
            }
        };

        let Some(body) = extract_fenced_block(&document) else {
            warn!(file = %path.display(), "Skipping agent file without a tagged structured block");
            continue;
        };

        let fallback_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("agent")
            .to_string();

        let block = parse_block(&body);
        let definition = AgentDefinition::from_block(&block, &fallback_id);
        debug!(agent_id = %definition.id, file = %path.display(), "Loaded agent definition");
        registry.insert(definition);
    }

    info!(
        dir = %dir.display(),
        agents = registry.len(),
        files = paths.len(),
        "Agent registry loaded"
    );

    Ok(registry)
}
