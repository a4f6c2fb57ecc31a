//! Minimal parser for the structured block embedded in agent definition files.
//!
//! The block is a constrained subset of YAML-like syntax, parsed line by line:
//!
//! - `key:` at column zero starts a section
//! - `key: value` inside a section is a scalar (unquoted values are strings)
//! - `key:` inside a section opens a list
//! - `- item` appends to the most recently opened list
//!
//! One level of nesting below a section, nothing more. Agent files are
//! author-controlled and small, so the subset is the contract; this is
//! deliberately not a general YAML parser.

use std::collections::BTreeMap;

/// One parsed section of a structured block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSection {
    /// `key: value` entries within the section.
    pub scalars: BTreeMap<String, String>,
    /// `key:` entries followed by `- item` lines, in file order.
    pub lists: BTreeMap<String, Vec<String>>,
}

/// A fully parsed structured block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBlock {
    /// Scalars appearing before any section header.
    pub root: BTreeMap<String, String>,
    /// Named sections in the block.
    pub sections: BTreeMap<String, BlockSection>,
}

impl ParsedBlock {
    /// Look up a scalar in the given section, falling back to the root scalars.
    pub fn scalar(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.scalars.get(key))
            .or_else(|| self.root.get(key))
            .map(String::as_str)
    }

    /// Look up a list in the given section.
    pub fn list(&self, section: &str, key: &str) -> Option<&[String]> {
        self.sections
            .get(section)
            .and_then(|s| s.lists.get(key))
            .map(Vec::as_slice)
    }
}

/// Extract the body of the first fenced block tagged `yaml` or `yml`.
///
/// Returns `None` when the document has no such block.
pub fn extract_fenced_block(document: &str) -> Option<String> {
    let mut in_block = false;
    let mut body = String::new();

    for line in document.lines() {
        let trimmed = line.trim_start();
        if !in_block {
            if let Some(tag) = trimmed.strip_prefix("```") {
                let tag = tag.trim();
                if tag.eq_ignore_ascii_case("yaml") || tag.eq_ignore_ascii_case("yml") {
                    in_block = true;
                }
            }
        } else {
            if trimmed.starts_with("```") {
                return Some(body);
            }
            body.push_str(line);
            body.push('\n');
        }
    }

    // Unterminated fence: treat the remainder as the block body.
    if in_block {
        Some(body)
    } else {
        None
    }
}

/// Parse a structured block body into sections, scalars, and lists.
///
/// Never fails: lines that do not match the subset grammar are skipped, so a
/// malformed block degrades to empty defaults instead of aborting a load.
pub fn parse_block(body: &str) -> ParsedBlock {
    let mut block = ParsedBlock::default();
    let mut current_section: Option<String> = None;
    let mut current_list: Option<String> = None;

    for raw in body.lines() {
        let line = raw.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // List entry under the most recently opened `key:` line.
        if let Some(item) = trimmed.strip_prefix("- ") {
            if let (Some(section), Some(key)) = (&current_section, &current_list) {
                block
                    .sections
                    .entry(section.clone())
                    .or_default()
                    .lists
                    .entry(key.clone())
                    .or_default()
                    .push(unquote(item));
            }
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');

        if !indented {
            current_list = None;
            if let Some(name) = trimmed.strip_suffix(':') {
                if !name.contains(':') {
                    let name = name.trim().to_string();
                    block.sections.entry(name.clone()).or_default();
                    current_section = Some(name);
                    continue;
                }
            }
            if let Some((key, value)) = split_scalar(trimmed) {
                block.root.insert(key, value);
                current_section = None;
            }
            continue;
        }

        // Indented content belongs to the current section, if any.
        let Some(section) = current_section.clone() else {
            continue;
        };

        if let Some(key) = trimmed.strip_suffix(':') {
            if !key.contains(':') {
                let key = key.trim().to_string();
                block
                    .sections
                    .entry(section)
                    .or_default()
                    .lists
                    .entry(key.clone())
                    .or_default();
                current_list = Some(key);
                continue;
            }
        }

        if let Some((key, value)) = split_scalar(trimmed) {
            block
                .sections
                .entry(section)
                .or_default()
                .scalars
                .insert(key, value);
            current_list = None;
        }
    }

    block
}

/// Split a `key: value` line, returning `None` when key or value is missing.
fn split_scalar(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), unquote(value)))
}

/// Strip one matching pair of surrounding quotes, if present.
fn unquote(value: &str) -> String {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
