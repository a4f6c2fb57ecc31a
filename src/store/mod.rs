//! In-memory versioned document store.
//!
//! Documents ("story files") are owned exclusively by the store; content only
//! changes through [`DocumentStore::update`], which snapshots every distinct
//! revision as an append-only [`DocumentVersion`]. Version numbers start at 1,
//! equal the number of snapshots ever taken, and are never reused or skipped.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// A versioned text document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Display filename.
    pub filename: String,
    /// Current content.
    pub content: String,
    /// Current version number; equals the number of snapshots ever taken.
    pub version: u64,
    /// Arbitrary metadata, shallow-merged on update.
    pub metadata: BTreeMap<String, Value>,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// When the document last changed.
    pub updated_at: DateTime<Utc>,
}

/// Append-only snapshot of a document at one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Unique version record identifier.
    pub id: String,
    /// Owning document.
    pub document_id: String,
    /// Version number this record snapshots.
    pub version: u64,
    /// Full content at this version.
    pub content: String,
    /// Metadata at this version.
    pub metadata: BTreeMap<String, Value>,
    /// Who created this version.
    pub created_by: String,
    /// When the version was created.
    pub created_at: DateTime<Utc>,
    /// Optional commit message.
    pub commit_message: Option<String>,
}

/// Kind of line change reported by [`DocumentStore::diff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Line exists only on the new side.
    Add,
    /// Line exists only on the old side.
    Remove,
    /// Line exists on both sides with different content.
    Modify,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Remove => write!(f, "remove"),
            ChangeKind::Modify => write!(f, "modify"),
        }
    }
}

/// One changed line position in a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineChange {
    /// 1-based line number.
    pub line: usize,
    /// What happened at this position.
    pub kind: ChangeKind,
    /// Old content, when present on the old side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
    /// New content, when present on the new side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,
}

/// Diff between two versions of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDiff {
    /// Count of added lines (a modify counts one addition and one deletion).
    pub additions: usize,
    /// Count of deleted lines.
    pub deletions: usize,
    /// Per-line changes in positional order.
    pub changes: Vec<LineChange>,
}

struct DocumentEntry {
    document: Document,
    versions: Vec<DocumentVersion>,
}

/// In-memory store for documents and their full version history.
#[derive(Default)]
pub struct DocumentStore {
    entries: RwLock<HashMap<String, DocumentEntry>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document at version 1 and snapshot it immediately.
    pub fn create(
        &self,
        project_id: impl Into<String>,
        filename: impl Into<String>,
        initial_content: impl Into<String>,
        metadata: BTreeMap<String, Value>,
        creator_id: impl Into<String>,
    ) -> Document {
        let now = Utc::now();
        let creator_id = creator_id.into();
        let document = Document {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            filename: filename.into(),
            content: initial_content.into(),
            version: 1,
            metadata,
            created_at: now,
            updated_at: now,
        };

        let snapshot = DocumentVersion {
            id: Uuid::new_v4().to_string(),
            document_id: document.id.clone(),
            version: 1,
            content: document.content.clone(),
            metadata: document.metadata.clone(),
            created_by: creator_id,
            created_at: now,
            commit_message: Some("Initial creation".to_string()),
        };

        let mut entries = self.entries.write().unwrap();
        entries.insert(
            document.id.clone(),
            DocumentEntry {
                document: document.clone(),
                versions: vec![snapshot],
            },
        );

        info!(document_id = %document.id, filename = %document.filename, "Document created");
        document
    }

    /// Get a document by id.
    pub fn get(&self, document_id: &str) -> StoreResult<Document> {
        let entries = self.entries.read().unwrap();
        entries
            .get(document_id)
            .map(|e| e.document.clone())
            .ok_or_else(|| StoreError::DocumentNotFound {
                document_id: document_id.to_string(),
            })
    }

    /// All documents in a project.
    pub fn list(&self, project_id: &str) -> Vec<Document> {
        let entries = self.entries.read().unwrap();
        let mut documents: Vec<_> = entries
            .values()
            .filter(|e| e.document.project_id == project_id)
            .map(|e| e.document.clone())
            .collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        documents
    }

    /// Update a document's content, snapshotting the new version.
    ///
    /// Byte-identical content is a no-op that returns the unchanged document:
    /// the history never holds two consecutive identical versions.
    pub fn update(
        &self,
        document_id: &str,
        new_content: &str,
        commit_message: Option<&str>,
        editor_id: &str,
        metadata_patch: BTreeMap<String, Value>,
    ) -> StoreResult<Document> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .get_mut(document_id)
            .ok_or_else(|| StoreError::DocumentNotFound {
                document_id: document_id.to_string(),
            })?;

        if entry.document.content == new_content {
            debug!(document_id = %document_id, "Update skipped, content unchanged");
            return Ok(entry.document.clone());
        }

        let now = Utc::now();
        entry.document.version += 1;
        entry.document.content = new_content.to_string();
        entry.document.updated_at = now;
        for (key, value) in metadata_patch {
            entry.document.metadata.insert(key, value);
        }

        let snapshot = DocumentVersion {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            version: entry.document.version,
            content: entry.document.content.clone(),
            metadata: entry.document.metadata.clone(),
            created_by: editor_id.to_string(),
            created_at: now,
            commit_message: commit_message.map(|s| s.to_string()),
        };
        entry.versions.push(snapshot);

        debug!(
            document_id = %document_id,
            version = entry.document.version,
            "Document updated"
        );
        Ok(entry.document.clone())
    }

    /// All version snapshots of a document, oldest first.
    pub fn versions(&self, document_id: &str) -> StoreResult<Vec<DocumentVersion>> {
        let entries = self.entries.read().unwrap();
        entries
            .get(document_id)
            .map(|e| e.versions.clone())
            .ok_or_else(|| StoreError::DocumentNotFound {
                document_id: document_id.to_string(),
            })
    }

    /// One version snapshot of a document.
    pub fn version(&self, document_id: &str, version: u64) -> StoreResult<DocumentVersion> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(document_id)
            .ok_or_else(|| StoreError::DocumentNotFound {
                document_id: document_id.to_string(),
            })?;
        entry
            .versions
            .iter()
            .find(|v| v.version == version)
            .cloned()
            .ok_or(StoreError::VersionNotFound {
                document_id: document_id.to_string(),
                version,
            })
    }

    /// Revert a document to the content of an earlier version.
    ///
    /// Always runs as a normal update (a new version is appended, history is
    /// never rewound), tagging metadata with `revertedFrom`. Reverting to a
    /// version whose content equals the current content hits the update
    /// no-op rule and changes nothing.
    pub fn revert_to(
        &self,
        document_id: &str,
        target_version: u64,
        editor_id: &str,
    ) -> StoreResult<Document> {
        let target = self.version(document_id, target_version)?;
        let mut patch = BTreeMap::new();
        patch.insert("revertedFrom".to_string(), Value::from(target_version));
        self.update(
            document_id,
            &target.content,
            Some(&format!("Reverted to version {}", target_version)),
            editor_id,
            patch,
        )
    }

    /// Positional line diff between two versions.
    ///
    /// Lines are compared index by index: a line only on the new side is an
    /// addition, only on the old side a deletion, differing on both sides one
    /// modify (counted as one addition and one deletion). There is no
    /// realignment, so a single inserted line shifts every later line into a
    /// modify; this matches the legacy behavior and is a known limitation,
    /// not something to silently fix.
    pub fn diff(
        &self,
        document_id: &str,
        from_version: u64,
        to_version: u64,
    ) -> StoreResult<DocumentDiff> {
        let from = self.version(document_id, from_version)?;
        let to = self.version(document_id, to_version)?;

        let old_lines: Vec<&str> = from.content.lines().collect();
        let new_lines: Vec<&str> = to.content.lines().collect();

        let mut diff = DocumentDiff {
            additions: 0,
            deletions: 0,
            changes: Vec::new(),
        };

        for i in 0..old_lines.len().max(new_lines.len()) {
            match (old_lines.get(i), new_lines.get(i)) {
                (None, Some(new)) => {
                    diff.additions += 1;
                    diff.changes.push(LineChange {
                        line: i + 1,
                        kind: ChangeKind::Add,
                        old: None,
                        new: Some((*new).to_string()),
                    });
                }
                (Some(old), None) => {
                    diff.deletions += 1;
                    diff.changes.push(LineChange {
                        line: i + 1,
                        kind: ChangeKind::Remove,
                        old: Some((*old).to_string()),
                        new: None,
                    });
                }
                (Some(old), Some(new)) if old != new => {
                    diff.additions += 1;
                    diff.deletions += 1;
                    diff.changes.push(LineChange {
                        line: i + 1,
                        kind: ChangeKind::Modify,
                        old: Some((*old).to_string()),
                        new: Some((*new).to_string()),
                    });
                }
                _ => {}
            }
        }

        Ok(diff)
    }

    /// Delete a document and its whole version history.
    ///
    /// Returns `false` when the document did not exist.
    pub fn delete(&self, document_id: &str) -> bool {
        let removed = self.entries.write().unwrap().remove(document_id).is_some();
        if removed {
            info!(document_id = %document_id, "Document deleted");
        }
        removed
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}
