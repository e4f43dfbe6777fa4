//! Deployment configuration.
//!
//! All process-level settings are read once at startup into an immutable
//! [`DeployConfig`] and passed by reference into the orchestrator. Components
//! never consult the environment themselves.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variables the config is built from.
const ENV_CLUSTER_NAME: &str = "EKS_CLUSTER_NAME";
const ENV_REGION: &str = "AWS_REGION";
const ENV_DOCKER_USERNAME: &str = "DOCKER_USERNAME";
const ENV_DOCKER_PASSWORD: &str = "DOCKER_PASSWORD";
const ENV_STAGING_ROOT: &str = "GITSHIP_STAGING_ROOT";

/// Immutable per-process deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// EKS cluster name.
    pub cluster_name: String,
    /// AWS region the cluster lives in.
    pub region: String,
    /// Docker Hub namespace images are pushed under (usually the username).
    pub docker_namespace: String,
    /// Docker Hub username.
    pub docker_username: String,
    /// Docker Hub password or access token. Never logged.
    #[serde(skip_serializing)]
    pub docker_password: String,
    /// Root directory for per-run clone staging areas.
    pub staging_root: PathBuf,
}

impl DeployConfig {
    /// Build the config from the process environment. Missing registry
    /// credentials are tolerated here; the orchestrator rejects requests
    /// during validation if they are absent.
    #[must_use]
    pub fn from_env() -> Self {
        let username = std::env::var(ENV_DOCKER_USERNAME).unwrap_or_default();
        Self {
            cluster_name: std::env::var(ENV_CLUSTER_NAME)
                .unwrap_or_else(|_| "gitship-cluster".to_string()),
            region: std::env::var(ENV_REGION).unwrap_or_else(|_| "us-east-1".to_string()),
            docker_namespace: username.clone(),
            docker_username: username,
            docker_password: std::env::var(ENV_DOCKER_PASSWORD).unwrap_or_default(),
            staging_root: std::env::var(ENV_STAGING_ROOT).map_or_else(
                |_| std::env::temp_dir().join("gitship-repos"),
                PathBuf::from,
            ),
        }
    }

    /// Config with defaults for tests and local runs.
    #[must_use]
    pub fn with_defaults(cluster_name: String) -> Self {
        Self {
            cluster_name,
            region: "us-east-1".into(),
            docker_namespace: "gitship".into(),
            docker_username: "gitship".into(),
            docker_password: "secret".into(),
            staging_root: std::env::temp_dir().join("gitship-repos"),
        }
    }

    /// Whether registry credentials are configured.
    #[must_use]
    pub fn has_registry_credentials(&self) -> bool {
        !self.docker_username.is_empty() && !self.docker_password.is_empty()
    }

    /// Image reference for a namespace identity, e.g. `acme/widget:latest`.
    #[must_use]
    pub fn image_reference(&self, slug: &str) -> String {
        format!("{}/{slug}:latest", self.docker_namespace)
    }

    /// AWS console URL for the cluster, included in the success payload.
    #[must_use]
    pub fn console_url(&self) -> String {
        format!(
            "https://{region}.console.aws.amazon.com/eks/home?region={region}#/clusters/{cluster}",
            region = self.region,
            cluster = self.cluster_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeployConfig::with_defaults("test-cluster".into());
        assert_eq!(config.cluster_name, "test-cluster");
        assert_eq!(config.region, "us-east-1");
        assert!(config.has_registry_credentials());
    }

    #[test]
    fn test_image_reference() {
        let config = DeployConfig::with_defaults("c".into());
        assert_eq!(config.image_reference("widget"), "gitship/widget:latest");
    }

    #[test]
    fn test_missing_credentials_detected() {
        let mut config = DeployConfig::with_defaults("c".into());
        config.docker_password = String::new();
        assert!(!config.has_registry_credentials());
    }

    #[test]
    fn test_console_url_names_region_and_cluster() {
        let config = DeployConfig::with_defaults("prod".into());
        let url = config.console_url();
        assert!(url.contains("us-east-1"));
        assert!(url.ends_with("#/clusters/prod"));
    }
}
