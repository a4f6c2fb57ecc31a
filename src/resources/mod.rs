//! Dependency resource backend.
//!
//! Agents declare resources by category (`data/`, `tasks/`, `templates/`,
//! `utils/`); the backend answers existence checks against a base directory
//! laid out as `<base>/<category>/<name>`.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::agents::DependencyKind;

/// Existence check for agent dependency resources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Whether the named resource exists under the given category.
    async fn exists(&self, kind: DependencyKind, name: &str) -> bool;
}

/// Filesystem-backed resources rooted at a base directory.
pub struct FsResources {
    base: PathBuf,
}

impl FsResources {
    /// Create a backend rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, kind: DependencyKind, name: &str) -> PathBuf {
        self.base.join(kind.to_string()).join(name)
    }
}

#[async_trait]
impl ResourceBackend for FsResources {
    async fn exists(&self, kind: DependencyKind, name: &str) -> bool {
        tokio::fs::metadata(self.resolve(kind, name)).await.is_ok()
    }
}
