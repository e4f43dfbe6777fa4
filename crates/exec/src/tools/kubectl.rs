//! kubectl operations against the target cluster.

use std::path::Path;
use std::sync::Arc;

use crate::runner::{Cmd, CommandOutput, CommandRunner, ExecutionError};

/// Cluster control surface, CLI-shaped.
///
/// Apply operations always pass `--validate=false`: deployed applications may
/// rely on custom resource definitions installed out-of-band, and client-side
/// schema validation would reject them.
#[derive(Clone)]
pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
}

impl Kubectl {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Apply a manifest file, optionally scoped to a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn apply_file(
        &self,
        path: &Path,
        namespace: Option<&str>,
    ) -> Result<CommandOutput, ExecutionError> {
        let mut cmd = Cmd::new("kubectl")
            .args(["apply", "-f"])
            .arg(path.to_string_lossy().to_string());
        if let Some(ns) = namespace {
            cmd = cmd.args(["-n", ns]);
        }
        self.runner.run(cmd.arg("--validate=false")).await
    }

    /// Apply an inline manifest via stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn apply_stdin(&self, yaml: &str) -> Result<CommandOutput, ExecutionError> {
        let cmd = Cmd::new("kubectl")
            .args(["apply", "-f", "-", "--validate=false"])
            .stdin(yaml);
        self.runner.run(cmd).await
    }

    /// Idempotently create a namespace: generate the manifest with a
    /// client-side dry run, then apply it. Re-applying an existing namespace
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if either kubectl invocation fails.
    pub async fn ensure_namespace(&self, name: &str) -> Result<(), ExecutionError> {
        let generated = self
            .runner
            .run(Cmd::new("kubectl").args([
                "create",
                "namespace",
                name,
                "--dry-run=client",
                "-o",
                "yaml",
            ]))
            .await?;
        self.apply_stdin(&generated.stdout).await?;
        Ok(())
    }

    /// Read a single named resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource does not exist or kubectl fails.
    pub async fn get(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(Cmd::new("kubectl").args(["get", kind, name, "-n", namespace]))
            .await
    }

    /// Read a cluster-scoped resource (no namespace).
    ///
    /// # Errors
    ///
    /// Returns an error if the resource does not exist or kubectl fails.
    pub async fn get_cluster_scoped(
        &self,
        kind: &str,
        name: &str,
    ) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(Cmd::new("kubectl").args(["get", kind, name]))
            .await
    }

    /// List all resources of a kind in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn get_all(
        &self,
        kind: &str,
        namespace: &str,
    ) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(Cmd::new("kubectl").args(["get", kind, "-n", namespace]))
            .await
    }

    /// Extract a jsonpath field from a named resource. Quiet: this is the
    /// polling read used by the endpoint resolver and would flood the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource does not exist or kubectl fails.
    pub async fn get_jsonpath_quiet(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        jsonpath: &str,
    ) -> Result<String, ExecutionError> {
        let out = self
            .runner
            .run(
                Cmd::new("kubectl")
                    .args(["get", kind, name, "-n", namespace, "-o"])
                    .arg(format!("jsonpath={jsonpath}"))
                    .quiet(),
            )
            .await?;
        Ok(out.stdout.trim().to_string())
    }

    /// Extract a jsonpath field across a label selector.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn get_selector_jsonpath(
        &self,
        kind: &str,
        namespace: &str,
        selector: &str,
        jsonpath: &str,
    ) -> Result<String, ExecutionError> {
        let out = self
            .runner
            .run(
                Cmd::new("kubectl")
                    .args(["get", kind, "-n", namespace, "-l", selector, "-o"])
                    .arg(format!("jsonpath={jsonpath}"))
                    .quiet(),
            )
            .await?;
        Ok(out.stdout.trim().to_string())
    }

    /// List pod names in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn pod_names(&self, namespace: &str) -> Result<Vec<String>, ExecutionError> {
        let out = self
            .runner
            .run(Cmd::new("kubectl").args([
                "get",
                "pods",
                "-n",
                namespace,
                "-o",
                "jsonpath={.items[*].metadata.name}",
            ]))
            .await?;
        Ok(out
            .stdout
            .split_whitespace()
            .map(ToString::to_string)
            .collect())
    }

    /// Tail logs from a pod.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn logs(
        &self,
        pod: &str,
        namespace: &str,
        tail: u32,
    ) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(
                Cmd::new("kubectl")
                    .args(["logs", pod, "-n", namespace])
                    .arg(format!("--tail={tail}")),
            )
            .await
    }

    /// Recent events in a namespace, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if kubectl fails.
    pub async fn events(&self, namespace: &str) -> Result<CommandOutput, ExecutionError> {
        self.runner
            .run(Cmd::new("kubectl").args([
                "get",
                "events",
                "-n",
                namespace,
                "--sort-by=.lastTimestamp",
            ]))
            .await
    }
}
