//! AWS CLI and eksctl operations for EKS cluster access.

use std::sync::Arc;

use crate::runner::{Cmd, CommandRunner, ExecutionError};

#[derive(Clone)]
pub struct Aws {
    runner: Arc<dyn CommandRunner>,
}

impl Aws {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Write cluster credentials into the local kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns an error if the aws CLI fails (bad credentials, no cluster).
    pub async fn update_kubeconfig(&self, cluster: &str, region: &str) -> Result<(), ExecutionError> {
        self.runner
            .run(Cmd::new("aws").args([
                "eks",
                "update-kubeconfig",
                "--name",
                cluster,
                "--region",
                region,
            ]))
            .await?;
        Ok(())
    }

    /// Read the cluster's OIDC issuer URL. Returns an empty string when the
    /// cluster has no issuer configured ("None" from the CLI is normalized
    /// away).
    ///
    /// # Errors
    ///
    /// Returns an error if the aws CLI fails.
    pub async fn oidc_issuer(&self, cluster: &str, region: &str) -> Result<String, ExecutionError> {
        let out = self
            .runner
            .run(Cmd::new("aws").args([
                "eks",
                "describe-cluster",
                "--name",
                cluster,
                "--region",
                region,
                "--query",
                "cluster.identity.oidc.issuer",
                "--output",
                "text",
            ]))
            .await?;
        let issuer = out.stdout.trim();
        if issuer.eq_ignore_ascii_case("none") {
            Ok(String::new())
        } else {
            Ok(issuer.to_string())
        }
    }

    /// Associate an IAM OIDC provider with the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if eksctl fails.
    pub async fn associate_oidc_provider(
        &self,
        cluster: &str,
        region: &str,
    ) -> Result<(), ExecutionError> {
        self.runner
            .run(Cmd::new("eksctl").args([
                "utils",
                "associate-iam-oidc-provider",
                "--cluster",
                cluster,
                "--region",
                region,
                "--approve",
            ]))
            .await?;
        Ok(())
    }
}
