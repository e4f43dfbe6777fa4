//! Cluster-level prerequisites.
//!
//! Four idempotent ensure-operations, each Check → (exists: no-op) |
//! (absent: Create → Verify). These are cluster-wide resources that persist
//! across runs. Each outcome is collected into a [`BootstrapReport`]; the
//! orchestrator decides what to do with failures (currently: log and
//! continue, favoring pipeline availability over strict bootstrap
//! correctness).

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use gitship_exec::{Aws, CommandRunner, Helm, Kubectl};

use crate::config::DeployConfig;
use crate::retry::{poll_until, Probe, RetryPolicy};

/// System namespace the load balancer controller is installed into.
const SYSTEM_NAMESPACE: &str = "kube-system";

/// Deployment name of the AWS load balancer controller.
const LB_CONTROLLER: &str = "aws-load-balancer-controller";

/// Readiness wait for freshly-installed controller pods: fixed 10s interval,
/// bounded at 5 minutes.
const CONTROLLER_READY_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 30,
    initial_delay: Duration::from_secs(10),
    max_delay: Duration::from_secs(10),
    multiplier: 1.0,
};

const INGRESS_CLASS_YAML: &str = "\
apiVersion: networking.k8s.io/v1
kind: IngressClass
metadata:
  name: alb
spec:
  controller: ingress.k8s.aws/alb
";

const STORAGE_CLASS_YAML: &str = "\
apiVersion: storage.k8s.io/v1
kind: StorageClass
metadata:
  name: ebs-sc
provisioner: ebs.csi.aws.com
parameters:
  type: gp3
  encrypted: \"true\"
volumeBindingMode: WaitForFirstConsumer
";

/// The cluster prerequisites Gitship ensures before deploying workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    OidcProvider,
    LoadBalancerController,
    IngressClass,
    StorageClass,
}

impl std::fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OidcProvider => write!(f, "OIDC provider"),
            Self::LoadBalancerController => write!(f, "load balancer controller"),
            Self::IngressClass => write!(f, "ingress class"),
            Self::StorageClass => write!(f, "storage class"),
        }
    }
}

/// A prerequisite that could not be ensured.
#[derive(Debug, Error)]
#[error("{prerequisite} bootstrap failed: {message}")]
pub struct BootstrapError {
    pub prerequisite: Prerequisite,
    pub message: String,
}

impl BootstrapError {
    fn new(prerequisite: Prerequisite, message: impl std::fmt::Display) -> Self {
        Self {
            prerequisite,
            message: message.to_string(),
        }
    }
}

/// Per-prerequisite outcomes of one bootstrap pass.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    outcomes: Vec<(Prerequisite, Result<(), BootstrapError>)>,
}

impl BootstrapReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, result)| result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BootstrapError> {
        self.outcomes
            .iter()
            .filter_map(|(_, result)| result.as_ref().err())
    }

    /// Log each outcome. Failures are warnings: the pipeline continues.
    pub fn log(&self) {
        for (prerequisite, result) in &self.outcomes {
            match result {
                Ok(()) => info!(prerequisite = %prerequisite, "Cluster prerequisite ensured"),
                Err(e) => warn!(prerequisite = %prerequisite, error = %e, "Cluster prerequisite failed; continuing"),
            }
        }
    }
}

/// Ensures cluster-wide prerequisites exist before workloads are deployed.
pub struct ClusterBootstrap {
    aws: Aws,
    helm: Helm,
    kubectl: Kubectl,
    cluster_name: String,
    region: String,
}

impl ClusterBootstrap {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, config: &DeployConfig) -> Self {
        Self {
            aws: Aws::new(Arc::clone(&runner)),
            helm: Helm::new(Arc::clone(&runner)),
            kubectl: Kubectl::new(runner),
            cluster_name: config.cluster_name.clone(),
            region: config.region.clone(),
        }
    }

    /// Run all four ensure-operations, collecting per-prerequisite outcomes.
    /// Never fails as a whole.
    pub async fn ensure_all(&self) -> BootstrapReport {
        let mut report = BootstrapReport::default();
        report.outcomes.push((
            Prerequisite::OidcProvider,
            self.ensure_oidc_provider().await,
        ));
        report.outcomes.push((
            Prerequisite::LoadBalancerController,
            self.ensure_lb_controller().await,
        ));
        report
            .outcomes
            .push((Prerequisite::IngressClass, self.ensure_ingress_class().await));
        report
            .outcomes
            .push((Prerequisite::StorageClass, self.ensure_storage_class().await));
        report
    }

    /// Associate an IAM OIDC provider with the cluster if none is configured.
    async fn ensure_oidc_provider(&self) -> Result<(), BootstrapError> {
        let check = |e| BootstrapError::new(Prerequisite::OidcProvider, e);

        let issuer = self
            .aws
            .oidc_issuer(&self.cluster_name, &self.region)
            .await
            .map_err(check)?;
        if !issuer.is_empty() {
            info!(issuer, "OIDC provider already associated");
            return Ok(());
        }

        self.aws
            .associate_oidc_provider(&self.cluster_name, &self.region)
            .await
            .map_err(check)?;

        // Verify the association took.
        let issuer = self
            .aws
            .oidc_issuer(&self.cluster_name, &self.region)
            .await
            .map_err(check)?;
        if issuer.is_empty() {
            return Err(BootstrapError::new(
                Prerequisite::OidcProvider,
                "issuer still empty after association",
            ));
        }
        Ok(())
    }

    /// Install the AWS load balancer controller via helm if its deployment
    /// is absent, then wait for at least one controller pod to be ready.
    async fn ensure_lb_controller(&self) -> Result<(), BootstrapError> {
        let wrap = |e| BootstrapError::new(Prerequisite::LoadBalancerController, e);

        if self
            .kubectl
            .get("deployment", LB_CONTROLLER, SYSTEM_NAMESPACE)
            .await
            .is_ok()
        {
            info!("Load balancer controller already installed");
            return Ok(());
        }

        self.helm
            .repo_add("eks", "https://aws.github.io/eks-charts")
            .await
            .map_err(wrap)?;
        self.helm.repo_update().await.map_err(wrap)?;
        self.helm
            .install(
                LB_CONTROLLER,
                "eks/aws-load-balancer-controller",
                SYSTEM_NAMESPACE,
                &[("clusterName", self.cluster_name.as_str())],
            )
            .await
            .map_err(wrap)?;

        let selector = format!("app.kubernetes.io/name={LB_CONTROLLER}");
        let ready = poll_until(&CONTROLLER_READY_POLICY, |_| async {
            match self
                .kubectl
                .get_selector_jsonpath(
                    "pods",
                    SYSTEM_NAMESPACE,
                    &selector,
                    "{.items[*].status.containerStatuses[*].ready}",
                )
                .await
            {
                Ok(states) if states.split_whitespace().any(|s| s == "true") => Probe::Ready(()),
                _ => Probe::NotReady,
            }
        })
        .await;

        ready.ok_or_else(|| {
            BootstrapError::new(
                Prerequisite::LoadBalancerController,
                "no controller pod became ready within the wait window",
            )
        })
    }

    /// (Re-)apply the default ALB ingress class. Applying is already
    /// idempotent, so there is no existence check.
    async fn ensure_ingress_class(&self) -> Result<(), BootstrapError> {
        self.kubectl
            .apply_stdin(INGRESS_CLASS_YAML)
            .await
            .map_err(|e| BootstrapError::new(Prerequisite::IngressClass, e))?;
        Ok(())
    }

    /// Create the encrypted gp3 storage class if absent.
    async fn ensure_storage_class(&self) -> Result<(), BootstrapError> {
        if self
            .kubectl
            .get_cluster_scoped("storageclass", "ebs-sc")
            .await
            .is_ok()
        {
            info!("Storage class already present");
            return Ok(());
        }

        self.kubectl
            .apply_stdin(STORAGE_CLASS_YAML)
            .await
            .map_err(|e| BootstrapError::new(Prerequisite::StorageClass, e))?;
        Ok(())
    }
}
