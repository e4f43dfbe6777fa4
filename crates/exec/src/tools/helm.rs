//! Helm chart operations.

use std::sync::Arc;

use crate::runner::{Cmd, CommandRunner, ExecutionError};

#[derive(Clone)]
pub struct Helm {
    runner: Arc<dyn CommandRunner>,
}

impl Helm {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Register a chart repository. Re-adding an existing repo succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if helm fails.
    pub async fn repo_add(&self, name: &str, url: &str) -> Result<(), ExecutionError> {
        self.runner
            .run(Cmd::new("helm").args(["repo", "add", name, url]))
            .await?;
        Ok(())
    }

    /// Refresh chart repository indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if helm fails.
    pub async fn repo_update(&self) -> Result<(), ExecutionError> {
        self.runner
            .run(Cmd::new("helm").args(["repo", "update"]))
            .await?;
        Ok(())
    }

    /// Install a release into a namespace with `--set` overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the install fails.
    pub async fn install(
        &self,
        release: &str,
        chart: &str,
        namespace: &str,
        sets: &[(&str, &str)],
    ) -> Result<(), ExecutionError> {
        let mut cmd = Cmd::new("helm").args(["install", release, chart, "-n", namespace]);
        for (key, value) in sets {
            cmd = cmd.arg("--set").arg(format!("{key}={value}"));
        }
        self.runner.run(cmd).await?;
        Ok(())
    }
}
