//! Workload deployment: apply the manifest and verify it landed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use gitship_exec::{CommandRunner, Kubectl};

use crate::diagnostics::Diagnostics;
use crate::error::DeployError;
use crate::manifest::{self, deployment_name, service_name};

/// Applies the workload manifest into the deployment namespace and reads it
/// back.
pub struct WorkloadDeployer {
    kubectl: Kubectl,
    diagnostics: Diagnostics,
}

impl WorkloadDeployer {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            kubectl: Kubectl::new(Arc::clone(&runner)),
            diagnostics: Diagnostics::new(runner),
        }
    }

    /// Render, apply, and verify the workload. The manifest is written to a
    /// temporary file for the apply and removed afterwards regardless of
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering, the apply, or any verification read
    /// fails. Verification failures trigger a cluster diagnostics sweep
    /// (logged) before the original error is surfaced.
    pub async fn deploy(
        &self,
        namespace: &str,
        slug: &str,
        image: &str,
        env_variables: &BTreeMap<String, String>,
    ) -> Result<(), DeployError> {
        let yaml = manifest::render(namespace, slug, image, env_variables)?;
        let path = temp_manifest_path(slug);
        std::fs::write(&path, &yaml)
            .map_err(|e| DeployError::io(format!("failed to write manifest {}", path.display()), e))?;

        let result = self.apply_and_verify(namespace, slug, &path).await;

        // Best-effort cleanup.
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to remove manifest file");
        }

        result
    }

    async fn apply_and_verify(
        &self,
        namespace: &str,
        slug: &str,
        path: &std::path::Path,
    ) -> Result<(), DeployError> {
        self.kubectl.apply_file(path, Some(namespace)).await?;
        info!(namespace, "Workload manifest applied");

        match self.verify(namespace, slug).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let report = self.diagnostics.cluster_sweep(namespace).await;
                warn!("Cluster diagnostics after verification failure:\n{report}");
                Err(e)
            }
        }
    }

    /// Read back each resource the apply should have produced. These reads
    /// are observability: they confirm creation and produce a useful error
    /// when the cluster rejected part of the manifest.
    async fn verify(&self, namespace: &str, slug: &str) -> Result<(), DeployError> {
        self.kubectl
            .get("deployment", &deployment_name(slug), namespace)
            .await?;
        self.kubectl.get_all("pods", namespace).await?;
        self.kubectl
            .get("service", &service_name(slug), namespace)
            .await?;
        self.kubectl
            .get("endpoints", &service_name(slug), namespace)
            .await?;
        Ok(())
    }
}

fn temp_manifest_path(slug: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "gitship-{slug}-{}.yaml",
        Uuid::new_v4().simple()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{failed, ok_output, FakeRunner};

    #[tokio::test]
    async fn applies_then_verifies_all_four_resources() {
        let runner = FakeRunner::succeeding_all("ok");
        let deployer = WorkloadDeployer::new(runner.arc());

        deployer
            .deploy("widget", "widget", "acme/widget:latest", &BTreeMap::new())
            .await
            .expect("deploy should succeed");

        let calls = runner.calls();
        assert_eq!(runner.count_invocations("kubectl", "apply"), 1);
        assert_eq!(runner.count_invocations("kubectl", "get"), 4);

        // Apply must skip client-side validation for out-of-band CRDs.
        let apply = calls
            .iter()
            .find(|c| c.arg_list().first().map(String::as_str) == Some("apply"))
            .unwrap();
        assert!(apply.arg_list().iter().any(|a| a == "--validate=false"));
    }

    #[tokio::test]
    async fn verification_failure_runs_diagnostics_and_surfaces_the_error() {
        let runner = FakeRunner::new(|cmd| {
            match cmd.arg_list().first().map(String::as_str) {
                // Apply succeeds, every read-back fails.
                Some("apply") => Ok(ok_output("applied")),
                Some("get") | Some("logs") => Err(failed("kubectl", "NotFound")),
                _ => Ok(ok_output("ok")),
            }
        });
        let deployer = WorkloadDeployer::new(runner.arc());

        let err = deployer
            .deploy("widget", "widget", "acme/widget:latest", &BTreeMap::new())
            .await
            .expect_err("verification should fail");
        assert!(err.to_string().contains("NotFound"));

        // The diagnostics sweep ran: more kubectl reads than the four
        // verification calls alone.
        assert!(runner.count_invocations("kubectl", "get") > 4);
    }

    #[tokio::test]
    async fn manifest_temp_file_is_removed_after_apply() {
        let runner = FakeRunner::succeeding_all("ok");
        let deployer = WorkloadDeployer::new(runner.arc());

        deployer
            .deploy("tmpcheck", "tmpcheck", "acme/tmpcheck:latest", &BTreeMap::new())
            .await
            .unwrap();

        let stale: Vec<_> = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("gitship-tmpcheck-")
            })
            .collect();
        assert!(stale.is_empty(), "manifest file must not survive the apply");
    }
}
