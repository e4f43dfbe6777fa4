//! Git operations.

use std::path::Path;
use std::sync::Arc;

use crate::runner::{Cmd, CommandRunner, ExecutionError};

#[derive(Clone)]
pub struct Git {
    runner: Arc<dyn CommandRunner>,
}

impl Git {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Clone a repository into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone fails (bad URL, auth, network).
    pub async fn clone(&self, url: &str, dest: &Path) -> Result<(), ExecutionError> {
        self.runner
            .run(
                Cmd::new("git")
                    .args(["clone", url])
                    .arg(dest.to_string_lossy().to_string()),
            )
            .await?;
        Ok(())
    }
}
