//! Image building and registry publishing.
//!
//! Clone → ensure build file → build → push. The push owns a bounded retry
//! loop: registry sessions go stale and transient network failures are
//! common, so each attempt re-authenticates (logout then login, forcing a
//! credential refresh), rebuilds, and pushes under a hard timeout. A
//! pipe-style failure additionally triggers an advisory network sweep.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use gitship_exec::{CommandRunner, Docker, Git};

use crate::config::DeployConfig;
use crate::diagnostics::Diagnostics;
use crate::dockerfile::{self, BuildFile};
use crate::error::DeployError;
use crate::staging::StagingArea;

/// Push attempts before giving up.
const PUSH_ATTEMPTS: u32 = 3;

/// Hard timeout on a single `docker push`.
const PUSH_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds and publishes the container image for one deployment run.
pub struct ImagePublisher {
    git: Git,
    docker: Docker,
    diagnostics: Diagnostics,
    config: DeployConfig,
}

impl ImagePublisher {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, config: DeployConfig) -> Self {
        Self {
            git: Git::new(Arc::clone(&runner)),
            docker: Docker::new(Arc::clone(&runner)),
            diagnostics: Diagnostics::new(runner),
            config,
        }
    }

    /// Validate that the repository URL is an absolute HTTPS URL.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Validation`] otherwise.
    pub fn validate_repo_url(repo_url: &str) -> Result<(), DeployError> {
        let parsed = Url::parse(repo_url)
            .map_err(|e| DeployError::Validation(format!("invalid repository URL: {e}")))?;
        if parsed.scheme() != "https" {
            return Err(DeployError::Validation(format!(
                "repository URL must use https, got `{}`",
                parsed.scheme()
            )));
        }
        Ok(())
    }

    /// Clone the repository into the staging area.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone fails.
    pub async fn clone_repository(
        &self,
        repo_url: &str,
        staging: &StagingArea,
    ) -> Result<(), DeployError> {
        self.git.clone(repo_url, staging.path()).await?;
        Ok(())
    }

    /// Ensure the clone has a Dockerfile, synthesizing one when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a synthesized Dockerfile cannot be written.
    pub fn ensure_build_file(&self, staging: &StagingArea) -> Result<BuildFile, DeployError> {
        dockerfile::ensure_dockerfile(staging.path())
    }

    /// Build the image from the staging area.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails.
    pub async fn build(&self, image: &str, staging: &StagingArea) -> Result<(), DeployError> {
        self.docker.build(image, staging.path()).await?;
        Ok(())
    }

    /// Push the image with bounded retries.
    ///
    /// Each attempt: logout (best-effort), login, rebuild (registry-auth-
    /// dependent build steps may need the fresh session), push under a
    /// 5-minute timeout. Linear backoff of `attempt × 2s` between attempts.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PushExhausted`] naming the attempt count once
    /// every attempt has failed.
    pub async fn push_with_retry(
        &self,
        image: &str,
        staging: &StagingArea,
    ) -> Result<(), DeployError> {
        let mut last_error = None;

        for attempt in 1..=PUSH_ATTEMPTS {
            info!(attempt, image, "Pushing image");
            match self.push_once(image, staging).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "Push attempt failed");
                    if is_network_pipe_error(&e.to_string()) {
                        // Advisory only: logged, never blocks the retry.
                        let report = self.diagnostics.network_sweep().await;
                        warn!("Network diagnostics after push failure:\n{report}");
                    }
                    last_error = Some(e);
                    if attempt < PUSH_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(u64::from(attempt) * 2)).await;
                    }
                }
            }
        }

        // last_error is always set when the loop falls through.
        let last = last_error.ok_or_else(|| {
            DeployError::Validation("push retry loop exited without an error".into())
        })?;
        Err(DeployError::PushExhausted {
            attempts: PUSH_ATTEMPTS,
            last,
        })
    }

    async fn push_once(
        &self,
        image: &str,
        staging: &StagingArea,
    ) -> Result<(), gitship_exec::ExecutionError> {
        // Force a credential refresh; a failed logout only means there was
        // no session to clear.
        if let Err(e) = self.docker.logout().await {
            warn!(error = %e, "docker logout failed; continuing");
        }
        self.docker
            .login(&self.config.docker_username, &self.config.docker_password)
            .await?;
        self.docker.build(image, staging.path()).await?;
        self.docker.push(image, PUSH_TIMEOUT).await
    }
}

/// Whether an error message looks like a broken network pipe between docker
/// and the registry.
fn is_network_pipe_error(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("broken pipe")
        || msg.contains("connection reset")
        || msg.contains("unexpected eof")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::testutil::{failed, ok_output, FakeRunner};

    fn publisher(runner: &Arc<FakeRunner>) -> ImagePublisher {
        ImagePublisher::new(runner.arc(), DeployConfig::with_defaults("test".into()))
    }

    fn staging() -> (tempfile::TempDir, StagingArea) {
        let root = tempfile::tempdir().unwrap();
        let area = StagingArea::create_with_token(root.path(), "widget", "tok").unwrap();
        (root, area)
    }

    #[test]
    fn url_validation_requires_https() {
        assert!(ImagePublisher::validate_repo_url("https://github.com/acme/widget.git").is_ok());
        assert!(matches!(
            ImagePublisher::validate_repo_url("http://github.com/acme/widget.git"),
            Err(DeployError::Validation(_))
        ));
        assert!(matches!(
            ImagePublisher::validate_repo_url("git@github.com:acme/widget.git"),
            Err(DeployError::Validation(_))
        ));
        assert!(matches!(
            ImagePublisher::validate_repo_url("not a url"),
            Err(DeployError::Validation(_))
        ));
    }

    #[test]
    fn network_pipe_detection() {
        assert!(is_network_pipe_error("write: Broken pipe"));
        assert!(is_network_pipe_error("read: connection reset by peer"));
        assert!(!is_network_pipe_error("denied: requested access to the resource is denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn push_succeeds_after_two_transient_failures() {
        let push_attempts = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&push_attempts);
        let runner = FakeRunner::new(move |cmd| {
            if cmd.program() == "docker" && cmd.arg_list().first().map(String::as_str) == Some("push")
            {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n <= 2 {
                    return Err(failed("docker push", "write: broken pipe"));
                }
            }
            Ok(ok_output("ok"))
        });
        let publisher = publisher(&runner);
        let (_root, area) = staging();

        publisher
            .push_with_retry("acme/widget:latest", &area)
            .await
            .expect("third attempt should succeed");

        assert_eq!(runner.count_invocations("docker", "push"), 3);
        // Every attempt re-authenticates and rebuilds.
        assert_eq!(runner.count_invocations("docker", "login"), 3);
        assert_eq!(runner.count_invocations("docker", "build"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_push_failure_exhausts_after_three_attempts() {
        let runner = FakeRunner::new(|cmd| {
            if cmd.program() == "docker" && cmd.arg_list().first().map(String::as_str) == Some("push")
            {
                return Err(failed("docker push", "denied: access to resource"));
            }
            Ok(ok_output("ok"))
        });
        let publisher = publisher(&runner);
        let (_root, area) = staging();

        let err = publisher
            .push_with_retry("acme/widget:latest", &area)
            .await
            .expect_err("push should exhaust");

        assert_eq!(runner.count_invocations("docker", "push"), 3);
        assert!(err.to_string().contains("3 attempts"));
        assert!(matches!(err, DeployError::PushExhausted { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn pipe_failures_trigger_the_advisory_network_sweep() {
        let runner = FakeRunner::new(|cmd| {
            if cmd.program() == "docker" && cmd.arg_list().first().map(String::as_str) == Some("push")
            {
                return Err(failed("docker push", "write: broken pipe"));
            }
            Ok(ok_output("ok"))
        });
        let publisher = publisher(&runner);
        let (_root, area) = staging();

        let _ = publisher.push_with_retry("acme/widget:latest", &area).await;

        // The sweep probes docker networks; its presence shows diagnostics
        // ran without blocking the retries.
        assert!(runner.count_invocations("docker", "network") >= 1);
        assert_eq!(runner.count_invocations("docker", "push"), 3);
    }
}
