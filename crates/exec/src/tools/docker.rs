//! Docker build and registry operations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::runner::{Cmd, CommandOutput, CommandRunner, ExecutionError};

/// Registry client plus local image builder.
#[derive(Clone)]
pub struct Docker {
    runner: Arc<dyn CommandRunner>,
}

impl Docker {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Build an image from a directory containing a Dockerfile.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails.
    pub async fn build(&self, tag: &str, context_dir: &Path) -> Result<(), ExecutionError> {
        self.runner
            .run(
                Cmd::new("docker")
                    .args(["build", "-t", tag])
                    .arg(context_dir.to_string_lossy().to_string()),
            )
            .await?;
        Ok(())
    }

    /// Push an image, killed after `timeout` if the registry stalls.
    ///
    /// # Errors
    ///
    /// Returns an error if the push fails or times out.
    pub async fn push(&self, tag: &str, timeout: Duration) -> Result<(), ExecutionError> {
        self.runner
            .run(Cmd::new("docker").args(["push", tag]).timeout(timeout))
            .await?;
        Ok(())
    }

    /// Log in to the registry. The password travels over stdin so it never
    /// appears in argv or logs.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ExecutionError> {
        self.runner
            .run(
                Cmd::new("docker")
                    .args(["login", "-u", username, "--password-stdin"])
                    .stdin(password),
            )
            .await?;
        Ok(())
    }

    /// Log out of the registry. Callers treat failures as best-effort.
    ///
    /// # Errors
    ///
    /// Returns an error if docker fails.
    pub async fn logout(&self) -> Result<(), ExecutionError> {
        self.runner.run(Cmd::new("docker").arg("logout")).await?;
        Ok(())
    }

    /// List docker networks (diagnostics).
    ///
    /// # Errors
    ///
    /// Returns an error if docker fails.
    pub async fn network_ls(&self) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(Cmd::new("docker").args(["network", "ls"]))
            .await
    }

    /// Inspect a docker network (diagnostics).
    ///
    /// # Errors
    ///
    /// Returns an error if docker fails.
    pub async fn network_inspect(&self, name: &str) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(Cmd::new("docker").args(["network", "inspect", name]))
            .await
    }
}
