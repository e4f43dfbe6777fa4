//! Deployment records and the sink they are persisted through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a deployment.
///
/// `Pending` covers both "run aborted" and "load balancer never assigned a
/// hostname"; a record only becomes `Deployed` when the resolved service URL
/// is a real address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStatus {
    Pending,
    Deployed,
}

impl DeploymentStatus {
    /// Derive the status from a service URL: only an `http`-prefixed value
    /// counts as a resolved address.
    #[must_use]
    pub fn from_service_url(service_url: &str) -> Self {
        if service_url.starts_with("http") {
            Self::Deployed
        } else {
            Self::Pending
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Deployed => write!(f, "Deployed"),
        }
    }
}

/// Record fields written at the end of a run, before the sink assigns an id.
/// Serialized camelCase: the persisted layout is shared with external
/// consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeploymentRecord {
    /// Owning user identifier.
    pub user: String,
    /// Source repository URL.
    pub repo_url: String,
    /// Computed image reference.
    pub image_name: String,
    /// Resolved service URL, or a pending/error sentinel.
    pub service_url: String,
    /// Lifecycle status.
    pub status: DeploymentStatus,
    /// Creation timestamp, RFC3339.
    pub deployed_at: String,
}

/// Persisted deployment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub id: String,
    pub user: String,
    pub repo_url: String,
    pub image_name: String,
    pub service_url: String,
    pub status: DeploymentStatus,
    pub deployed_at: String,
}

/// Persistence seam for deployment records. The store itself (database,
/// file, memory) is outside this crate's scope.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a record, returning it with an assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    async fn create(&self, record: NewDeploymentRecord) -> anyhow::Result<DeploymentRecord>;

    /// All records owned by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn find(&self, user: &str) -> anyhow::Result<Vec<DeploymentRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_layout_uses_camel_case_field_names() {
        let record = DeploymentRecord {
            id: "dep-1".into(),
            user: "alice".into(),
            repo_url: "https://github.com/acme/widget.git".into(),
            image_name: "acme/widget:latest".into(),
            service_url: "http://abc.elb.amazonaws.com".into(),
            status: DeploymentStatus::Deployed,
            deployed_at: "2026-08-29T12:00:00Z".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        for field in ["id", "user", "repoUrl", "imageName", "serviceUrl", "status", "deployedAt"] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(value["status"], "Deployed");
    }

    #[test]
    fn status_derivation_follows_http_prefix() {
        assert_eq!(
            DeploymentStatus::from_service_url("http://abc.elb.amazonaws.com"),
            DeploymentStatus::Deployed
        );
        assert_eq!(
            DeploymentStatus::from_service_url("https://abc.elb.amazonaws.com"),
            DeploymentStatus::Deployed
        );
        assert_eq!(
            DeploymentStatus::from_service_url("Pending - Load balancer provisioning in progress"),
            DeploymentStatus::Pending
        );
        assert_eq!(
            DeploymentStatus::from_service_url("Error: build failed"),
            DeploymentStatus::Pending
        );
    }
}
