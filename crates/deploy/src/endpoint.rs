//! Endpoint resolution: wait for the ALB hostname.
//!
//! The AWS load balancer controller provisions an ALB for the ingress
//! asynchronously; the hostname usually appears within a few minutes. The
//! resolver polls the ingress status under a bounded backoff and degrades to
//! a pending sentinel instead of failing the pipeline: the deployment is
//! live, only its address is still unknown.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use gitship_exec::{CommandRunner, Kubectl};

use crate::manifest::ingress_name;
use crate::retry::{poll_until, Probe, RetryPolicy};

/// Sentinel returned when the hostname never appeared. Deliberately not
/// `http`-prefixed so the derived record status stays `Pending`.
pub const PENDING_URL: &str = "Pending - Load balancer provisioning in progress";

/// Ingress polling: 30 attempts, 5s growing 1.5x per attempt, capped at 30s.
const INGRESS_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 30,
    initial_delay: Duration::from_secs(5),
    max_delay: Duration::from_secs(30),
    multiplier: 1.5,
};

/// Result of endpoint resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEndpoint {
    /// Load balancer hostname assigned.
    Resolved(String),
    /// Attempts exhausted before a hostname appeared.
    Pending,
}

impl ResolvedEndpoint {
    /// Service URL for the deployment record and the caller.
    #[must_use]
    pub fn service_url(&self) -> String {
        match self {
            Self::Resolved(hostname) => format!("http://{hostname}"),
            Self::Pending => PENDING_URL.to_string(),
        }
    }
}

/// Polls the ingress until its load balancer hostname is assigned.
pub struct EndpointResolver {
    kubectl: Kubectl,
}

impl EndpointResolver {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            kubectl: Kubectl::new(runner),
        }
    }

    /// Wait for the ingress hostname. An ingress that does not exist yet and
    /// a transient read error both count as "not ready"; only a present,
    /// non-empty hostname resolves. Never fails: exhaustion degrades to
    /// [`ResolvedEndpoint::Pending`].
    pub async fn resolve(&self, namespace: &str, slug: &str) -> ResolvedEndpoint {
        let name = ingress_name(slug);

        let hostname = poll_until(&INGRESS_POLICY, |_| async {
            match self
                .kubectl
                .get_jsonpath_quiet(
                    "ingress",
                    &name,
                    namespace,
                    "{.status.loadBalancer.ingress[0].hostname}",
                )
                .await
            {
                Ok(hostname) if !hostname.is_empty() => Probe::Ready(hostname),
                // Missing ingress or transient read failure: keep waiting.
                _ => Probe::NotReady,
            }
        })
        .await;

        match hostname {
            Some(hostname) => {
                info!(hostname, "Load balancer hostname assigned");
                ResolvedEndpoint::Resolved(hostname)
            }
            None => {
                info!("Load balancer hostname not assigned within the polling window");
                ResolvedEndpoint::Pending
            }
        }
    }
}
