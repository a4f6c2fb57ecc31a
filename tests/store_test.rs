//! Integration tests for the versioned document store.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use serde_json::Value;

use storyweave::error::StoreError;
use storyweave::store::{ChangeKind, DocumentStore};

fn create_doc(store: &DocumentStore, content: &str) -> String {
    store
        .create("proj-1", "draft.md", content, BTreeMap::new(), "author")
        .id
}

#[test]
fn test_version_counts_match_updates() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "v1");

    for i in 2..=6 {
        store
            .update(&id, &format!("v{}", i), None, "author", BTreeMap::new())
            .unwrap();
    }

    let doc = store.get(&id).unwrap();
    assert_eq!(doc.version, 6);

    let versions = store.versions(&id).unwrap();
    assert_eq!(versions.len(), 6);
    let numbers: Vec<u64> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_identical_update_is_noop() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "line1\nline2");

    let doc = store
        .update(&id, "line1\nline2", Some("no change"), "editor", BTreeMap::new())
        .unwrap();

    assert_eq!(doc.version, 1);
    assert_eq!(doc.content, "line1\nline2");
    assert_eq!(store.versions(&id).unwrap().len(), 1);
}

#[test]
fn test_revert_restores_content_as_new_version() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "first draft");
    store
        .update(&id, "second draft", None, "editor", BTreeMap::new())
        .unwrap();

    let reverted = store.revert_to(&id, 1, "editor").unwrap();

    assert_eq!(reverted.content, "first draft");
    assert_eq!(reverted.version, 3);
    assert_eq!(reverted.metadata["revertedFrom"], 1);

    let versions = store.versions(&id).unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(
        versions[2].commit_message.as_deref(),
        Some("Reverted to version 1")
    );
}

#[test]
fn test_revert_to_current_content_is_noop() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "same text");
    store
        .update(&id, "other text", None, "editor", BTreeMap::new())
        .unwrap();
    store
        .update(&id, "same text", None, "editor", BTreeMap::new())
        .unwrap();

    // Version 1 content equals current content, so the update no-op applies.
    let doc = store.revert_to(&id, 1, "editor").unwrap();
    assert_eq!(doc.version, 3);
    assert_eq!(store.versions(&id).unwrap().len(), 3);
}

#[test]
fn test_revert_to_missing_version_leaves_history_intact() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "content");

    let err = store.revert_to(&id, 5, "editor").unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionNotFound { version: 5, .. }
    ));

    let doc = store.get(&id).unwrap();
    assert_eq!(doc.version, 1);
    assert_eq!(store.versions(&id).unwrap().len(), 1);
}

#[test]
fn test_diff_identical_versions_is_empty() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "alpha\nbeta");
    store.update(&id, "changed", None, "e", BTreeMap::new()).unwrap();
    store.update(&id, "alpha\nbeta", None, "e", BTreeMap::new()).unwrap();

    let diff = store.diff(&id, 1, 3).unwrap();
    assert_eq!(diff.additions, 0);
    assert_eq!(diff.deletions, 0);
    assert!(diff.changes.is_empty());
}

#[test]
fn test_diff_appended_line() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "line1\nline2");
    store
        .update(&id, "line1\nline2\nline3", None, "e", BTreeMap::new())
        .unwrap();

    let diff = store.diff(&id, 1, 2).unwrap();
    assert_eq!(diff.additions, 1);
    assert_eq!(diff.deletions, 0);
    assert_eq!(diff.changes.len(), 1);

    let change = &diff.changes[0];
    assert_eq!(change.kind, ChangeKind::Add);
    assert_eq!(change.line, 3);
    assert_eq!(change.new.as_deref(), Some("line3"));
    assert_eq!(change.old, None);
}

#[test]
fn test_diff_modified_line_counts_both_ways() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "opening\nmiddle\nending");
    store
        .update(&id, "opening\nMIDDLE\nending", None, "e", BTreeMap::new())
        .unwrap();

    let diff = store.diff(&id, 1, 2).unwrap();
    assert_eq!(diff.additions, 1);
    assert_eq!(diff.deletions, 1);
    assert_eq!(diff.changes.len(), 1);
    assert_eq!(diff.changes[0].kind, ChangeKind::Modify);
    assert_eq!(diff.changes[0].line, 2);
    assert_eq!(diff.changes[0].old.as_deref(), Some("middle"));
    assert_eq!(diff.changes[0].new.as_deref(), Some("MIDDLE"));
}

#[test]
fn test_diff_positional_misalignment_is_preserved() {
    // Inserting one line at the top shifts every following line into a
    // modify; the positional comparison reports exactly that.
    let store = DocumentStore::new();
    let id = create_doc(&store, "a\nb");
    store.update(&id, "new\na\nb", None, "e", BTreeMap::new()).unwrap();

    let diff = store.diff(&id, 1, 2).unwrap();
    assert_eq!(diff.additions, 3);
    assert_eq!(diff.deletions, 2);
    assert_eq!(diff.changes.len(), 3);
    assert_eq!(diff.changes[0].kind, ChangeKind::Modify);
    assert_eq!(diff.changes[1].kind, ChangeKind::Modify);
    assert_eq!(diff.changes[2].kind, ChangeKind::Add);
}

#[test]
fn test_diff_missing_endpoint() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "content");

    let err = store.diff(&id, 1, 2).unwrap_err();
    assert!(matches!(err, StoreError::VersionNotFound { .. }));
}

#[test]
fn test_diff_missing_document() {
    let store = DocumentStore::new();
    let err = store.diff("nope", 1, 2).unwrap_err();
    assert!(matches!(err, StoreError::DocumentNotFound { .. }));
}

#[test]
fn test_delete_document_and_history() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "content");
    store.update(&id, "more", None, "e", BTreeMap::new()).unwrap();

    assert!(store.delete(&id));
    assert!(store.is_empty());
    assert!(!store.delete(&id));
}

#[test]
fn test_metadata_patch_does_not_apply_on_noop() {
    let store = DocumentStore::new();
    let id = create_doc(&store, "stable");

    let mut patch = BTreeMap::new();
    patch.insert("stage".to_string(), Value::from("final"));
    let doc = store.update(&id, "stable", None, "e", patch).unwrap();

    assert!(doc.metadata.get("stage").is_none());
}
