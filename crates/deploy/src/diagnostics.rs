//! Advisory diagnostic sweeps.
//!
//! Gathered after failures to give the caller something actionable. Every
//! probe is best-effort: a failing probe is recorded in the report text and
//! the sweep carries on. Nothing in this module ever propagates an error, so
//! diagnostics can never mask the failure that triggered them.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use gitship_exec::{Cmd, CommandRunner, Docker, Kubectl};

/// Registry endpoint probed for connectivity after push failures.
const REGISTRY_PROBE_URL: &str = "https://registry-1.docker.io/v2/";

/// Proxy-related environment variables worth surfacing in network reports.
const PROXY_ENV_VARS: [&str; 4] = ["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY", "DOCKER_HOST"];

pub struct Diagnostics {
    runner: Arc<dyn CommandRunner>,
    docker: Docker,
    kubectl: Kubectl,
}

impl Diagnostics {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            docker: Docker::new(Arc::clone(&runner)),
            kubectl: Kubectl::new(Arc::clone(&runner)),
            runner,
        }
    }

    /// Network-side sweep run when a registry push smells like a broken
    /// pipe: interfaces, DNS config, proxy environment, docker networks, and
    /// a registry connectivity probe.
    pub async fn network_sweep(&self) -> String {
        debug!("Running network diagnostics sweep");
        let mut report = String::from("=== Network diagnostics ===\n");

        self.probe(&mut report, "interfaces", Cmd::new("ip").arg("addr"))
            .await;
        self.probe(
            &mut report,
            "dns configuration",
            Cmd::new("cat").arg("/etc/resolv.conf"),
        )
        .await;

        let _ = writeln!(report, "--- proxy environment ---");
        for var in PROXY_ENV_VARS {
            match std::env::var(var) {
                Ok(value) if !value.is_empty() => {
                    let _ = writeln!(report, "{var}={value}");
                }
                _ => {
                    let _ = writeln!(report, "{var} unset");
                }
            }
        }

        match self.docker.network_ls().await {
            Ok(out) => {
                let _ = writeln!(report, "--- docker networks ---\n{}", out.text().trim());
            }
            Err(e) => {
                let _ = writeln!(report, "--- docker networks ---\nunavailable: {e}");
            }
        }
        match self.docker.network_inspect("bridge").await {
            Ok(out) => {
                let _ = writeln!(report, "--- bridge network ---\n{}", out.text().trim());
            }
            Err(e) => {
                let _ = writeln!(report, "--- bridge network ---\nunavailable: {e}");
            }
        }

        self.probe(
            &mut report,
            "registry connectivity",
            Cmd::new("curl").args(["-sS", "-m", "10", "-o", "/dev/null", "-w", "%{http_code}"])
                .arg(REGISTRY_PROBE_URL),
        )
        .await;

        report
    }

    /// Cluster-side sweep run when workload verification or the pipeline
    /// fails: namespaced resources, pod status, first pod's logs, and recent
    /// events.
    pub async fn cluster_sweep(&self, namespace: &str) -> String {
        debug!(namespace, "Running cluster diagnostics sweep");
        let mut report = format!("=== Cluster diagnostics for namespace {namespace} ===\n");

        match self.kubectl.get_all("all", namespace).await {
            Ok(out) => {
                let _ = writeln!(report, "--- resources ---\n{}", out.text().trim());
            }
            Err(e) => {
                let _ = writeln!(report, "--- resources ---\nunavailable: {e}");
            }
        }

        self.probe(
            &mut report,
            "pod status",
            Cmd::new("kubectl").args(["get", "pods", "-n", namespace, "-o", "wide"]),
        )
        .await;

        match self.kubectl.pod_names(namespace).await {
            Ok(pods) if !pods.is_empty() => match self.kubectl.logs(&pods[0], namespace, 50).await {
                Ok(out) => {
                    let _ = writeln!(report, "--- logs: {} ---\n{}", pods[0], out.text().trim());
                }
                Err(e) => {
                    let _ = writeln!(report, "--- logs: {} ---\nunavailable: {e}", pods[0]);
                }
            },
            Ok(_) => {
                let _ = writeln!(report, "--- logs ---\nno pods in namespace");
            }
            Err(e) => {
                let _ = writeln!(report, "--- logs ---\ncould not list pods: {e}");
            }
        }

        match self.kubectl.events(namespace).await {
            Ok(out) => {
                let _ = writeln!(report, "--- events ---\n{}", out.text().trim());
            }
            Err(e) => {
                let _ = writeln!(report, "--- events ---\nunavailable: {e}");
            }
        }

        report
    }

    async fn probe(&self, report: &mut String, title: &str, cmd: Cmd) {
        match self.runner.run(cmd).await {
            Ok(out) => {
                let _ = writeln!(report, "--- {title} ---\n{}", out.text().trim());
            }
            Err(e) => {
                let _ = writeln!(report, "--- {title} ---\nunavailable: {e}");
            }
        }
    }
}
