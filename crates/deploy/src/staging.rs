//! Per-run clone staging areas.
//!
//! Each run stages its clone under `{staging_root}/{slug}-{token}` where the
//! token is unique per invocation (uuid v4 by default), so concurrent runs
//! can never collide on disk. The area must be removed on every exit path;
//! the orchestrator owns that guarantee and removal failures are logged only.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DeployError;

/// A staging directory reserved for one deployment run.
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
}

impl StagingArea {
    /// Reserve a staging path with a fresh unique token.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging root cannot be created or a stale
    /// directory at the target path cannot be removed.
    pub fn create(root: &Path, slug: &str) -> Result<Self, DeployError> {
        Self::create_with_token(root, slug, &Uuid::new_v4().simple().to_string())
    }

    /// Reserve a staging path with an explicit token (tests use fixed ones).
    ///
    /// # Errors
    ///
    /// Returns an error if the staging root cannot be created or a stale
    /// directory at the target path cannot be removed.
    pub fn create_with_token(root: &Path, slug: &str, token: &str) -> Result<Self, DeployError> {
        std::fs::create_dir_all(root)
            .map_err(|e| DeployError::io(format!("failed to create staging root {}", root.display()), e))?;

        let path = root.join(format!("{slug}-{token}"));
        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(|e| {
                DeployError::io(format!("failed to clear stale staging dir {}", path.display()), e)
            })?;
        }

        info!(path = %path.display(), "Reserved staging area");
        Ok(Self { path })
    }

    /// Path the repository is cloned into. The clone itself creates the
    /// directory, so the path does not exist until then.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staging directory. Failures are logged, never propagated:
    /// cleanup must not mask a pipeline error.
    pub fn remove(self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "Removed staging area"),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staging area");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserves_unique_paths_per_token() {
        let root = tempfile::tempdir().unwrap();
        let a = StagingArea::create_with_token(root.path(), "widget", "aaa").unwrap();
        let b = StagingArea::create_with_token(root.path(), "widget", "bbb").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn clears_a_stale_directory_at_the_same_path() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("widget-tok");
        std::fs::create_dir_all(stale.join("leftover")).unwrap();

        let area = StagingArea::create_with_token(root.path(), "widget", "tok").unwrap();
        assert!(!area.path().join("leftover").exists());
    }

    #[test]
    fn remove_deletes_the_tree() {
        let root = tempfile::tempdir().unwrap();
        let area = StagingArea::create_with_token(root.path(), "widget", "tok").unwrap();
        std::fs::create_dir_all(area.path().join("src")).unwrap();
        std::fs::write(area.path().join("src/main.js"), "console.log(1)").unwrap();

        let path = area.path().to_path_buf();
        area.remove();
        assert!(!path.exists());
    }

    #[test]
    fn remove_of_never_materialized_area_is_a_noop() {
        let root = tempfile::tempdir().unwrap();
        let area = StagingArea::create_with_token(root.path(), "widget", "tok").unwrap();
        // No clone happened; path was never created.
        area.remove();
    }
}
