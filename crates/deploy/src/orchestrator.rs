//! Top-level deployment orchestration.
//!
//! One strictly-sequential pipeline per request: authenticate → validate →
//! configure cluster access → bootstrap (best-effort) → clone/build/push →
//! ensure namespace → deploy workload → resolve endpoint → persist record.
//! Inner components own their own retries; the orchestrator runs each stage
//! exactly once and aborts on the first unrecovered error. The staging area
//! is removed on every exit path.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use gitship_exec::{Aws, CommandRunner, Kubectl};

use crate::auth::CredentialStore;
use crate::bootstrap::ClusterBootstrap;
use crate::config::DeployConfig;
use crate::diagnostics::Diagnostics;
use crate::endpoint::EndpointResolver;
use crate::error::{DeployError, DeployFailure};
use crate::image::ImagePublisher;
use crate::names::namespace_identity;
use crate::progress::{ProgressSink, ProgressStep};
use crate::record::{DeploymentRecord, DeploymentStatus, NewDeploymentRecord, RecordSink};
use crate::staging::StagingArea;
use crate::workload::WorkloadDeployer;

/// One deployment request. Ephemeral: lives for a single orchestration run.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Absolute HTTPS URL of the repository to deploy.
    pub repo_url: String,
    /// Environment variables injected into the container.
    pub env_variables: BTreeMap<String, String>,
}

/// Success payload for the caller.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub message: String,
    pub image_url: String,
    pub service_url: String,
    pub deployment_id: String,
    pub aws_console_url: String,
}

/// Drives a deployment request through the full pipeline.
pub struct DeploymentOrchestrator {
    config: DeployConfig,
    aws: Aws,
    kubectl: Kubectl,
    bootstrap: ClusterBootstrap,
    publisher: ImagePublisher,
    workload: WorkloadDeployer,
    resolver: EndpointResolver,
    diagnostics: Diagnostics,
    credentials: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordSink>,
    progress: Arc<dyn ProgressSink>,
}

impl DeploymentOrchestrator {
    #[must_use]
    pub fn new(
        config: DeployConfig,
        runner: Arc<dyn CommandRunner>,
        credentials: Arc<dyn CredentialStore>,
        records: Arc<dyn RecordSink>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            aws: Aws::new(Arc::clone(&runner)),
            kubectl: Kubectl::new(Arc::clone(&runner)),
            bootstrap: ClusterBootstrap::new(Arc::clone(&runner), &config),
            publisher: ImagePublisher::new(Arc::clone(&runner), config.clone()),
            workload: WorkloadDeployer::new(Arc::clone(&runner)),
            resolver: EndpointResolver::new(Arc::clone(&runner)),
            diagnostics: Diagnostics::new(runner),
            config,
            credentials,
            records,
            progress,
        }
    }

    /// Run one deployment to completion.
    ///
    /// Concurrent runs are isolated on disk by unique staging paths, but the
    /// namespace and image tag derive from the repository URL alone: two
    /// simultaneous runs against the same repository will race on the
    /// cluster. There is no cross-run lock.
    ///
    /// # Errors
    ///
    /// Returns a [`DeployFailure`] carrying the root error, generic
    /// remediation suggestions, and best-effort diagnostics.
    pub async fn deploy(
        &self,
        token: &str,
        request: DeployRequest,
    ) -> Result<DeployOutcome, DeployFailure> {
        let user = self
            .credentials
            .authenticate(token)
            .await
            .ok_or_else(|| {
                DeployFailure::new(
                    DeployError::Unauthorized("invalid or missing credential".into()),
                    None,
                )
            })?;
        info!(user, repo_url = %request.repo_url, "Starting deployment");

        self.validate(&request)
            .map_err(|e| DeployFailure::new(e, None))?;
        let slug =
            namespace_identity(&request.repo_url).map_err(|e| DeployFailure::new(e, None))?;
        let image = self.config.image_reference(&slug);

        let mut staging: Option<StagingArea> = None;
        let result = self
            .run_pipeline(&request, &slug, &image, &mut staging)
            .await;

        // Scoped-resource release: the staging area goes away on success,
        // failure, and everything in between.
        if let Some(area) = staging.take() {
            area.remove();
        }

        match result {
            Ok(service_url) => {
                let record = self
                    .persist_record(&user, &request.repo_url, &image, &service_url)
                    .await
                    .map_err(|e| DeployFailure::new(e, None))?;

                self.progress.notify(ProgressStep::Completed);
                info!(deployment_id = %record.id, service_url, "Deployment finished");

                Ok(DeployOutcome {
                    message: "Deployment completed".to_string(),
                    image_url: image,
                    service_url,
                    deployment_id: record.id,
                    aws_console_url: self.config.console_url(),
                })
            }
            Err(e) => {
                error!(error = %e, "Deployment failed");
                let diagnostics = self.diagnostics.cluster_sweep(&slug).await;

                // Best-effort failure record; a sink error must not mask the
                // pipeline error.
                let sentinel = format!("Error: {e}");
                if let Err(record_err) = self
                    .persist_record(&user, &request.repo_url, &image, &sentinel)
                    .await
                {
                    warn!(error = %record_err, "Could not persist failure record");
                }

                Err(DeployFailure::new(e, Some(diagnostics)))
            }
        }
    }

    /// List the caller's deployment records, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`DeployFailure`] if the credential is invalid or the record
    /// store cannot be read.
    pub async fn list(&self, token: &str) -> Result<Vec<DeploymentRecord>, DeployFailure> {
        let user = self
            .credentials
            .authenticate(token)
            .await
            .ok_or_else(|| {
                DeployFailure::new(
                    DeployError::Unauthorized("invalid or missing credential".into()),
                    None,
                )
            })?;
        let mut records = self
            .records
            .find(&user)
            .await
            .map_err(|e| DeployFailure::new(DeployError::Record(e.to_string()), None))?;
        records.sort_by(|a, b| b.deployed_at.cmp(&a.deployed_at));
        Ok(records)
    }

    /// Validate request shape before touching the cluster or the disk.
    fn validate(&self, request: &DeployRequest) -> Result<(), DeployError> {
        ImagePublisher::validate_repo_url(&request.repo_url)?;
        if !self.config.has_registry_credentials() {
            return Err(DeployError::Validation(
                "Docker registry credentials are not configured".into(),
            ));
        }
        Ok(())
    }

    async fn run_pipeline(
        &self,
        request: &DeployRequest,
        slug: &str,
        image: &str,
        staging: &mut Option<StagingArea>,
    ) -> Result<String, DeployError> {
        self.progress.notify(ProgressStep::ConfiguringKubectl);
        self.aws
            .update_kubeconfig(&self.config.cluster_name, &self.config.region)
            .await?;

        self.progress.notify(ProgressStep::SettingUpClusterResources);
        let report = self.bootstrap.ensure_all().await;
        report.log();

        self.progress.notify(ProgressStep::CloningRepository);
        let area = staging.insert(StagingArea::create(&self.config.staging_root, slug)?);
        self.publisher
            .clone_repository(&request.repo_url, area)
            .await?;

        self.progress.notify(ProgressStep::SettingUpDockerfile);
        self.publisher.ensure_build_file(area)?;

        self.progress.notify(ProgressStep::BuildingImage);
        self.publisher.build(image, area).await?;

        self.progress.notify(ProgressStep::PushingImage);
        self.publisher.push_with_retry(image, area).await?;

        self.progress.notify(ProgressStep::CreatingNamespace);
        self.kubectl.ensure_namespace(slug).await?;

        self.progress.notify(ProgressStep::DeployingApplication);
        self.workload
            .deploy(slug, slug, image, &request.env_variables)
            .await?;

        self.progress.notify(ProgressStep::WaitingForLoadBalancer);
        let endpoint = self.resolver.resolve(slug, slug).await;

        Ok(endpoint.service_url())
    }

    async fn persist_record(
        &self,
        user: &str,
        repo_url: &str,
        image: &str,
        service_url: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        let record = NewDeploymentRecord {
            user: user.to_string(),
            repo_url: repo_url.to_string(),
            image_name: image.to_string(),
            service_url: service_url.to_string(),
            status: DeploymentStatus::from_service_url(service_url),
            deployed_at: chrono::Utc::now().to_rfc3339(),
        };
        self.records
            .create(record)
            .await
            .map_err(|e| DeployError::Record(e.to_string()))
    }
}
