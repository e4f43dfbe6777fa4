//! Progress notifications.
//!
//! Consumers (the progress UI) match on exact string identity, so the step
//! messages are canonical literals and must never be reworded.

/// The ten pipeline step notifications, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    ConfiguringKubectl,
    SettingUpClusterResources,
    CloningRepository,
    SettingUpDockerfile,
    BuildingImage,
    PushingImage,
    CreatingNamespace,
    DeployingApplication,
    WaitingForLoadBalancer,
    Completed,
}

impl ProgressStep {
    /// Canonical message for this step.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::ConfiguringKubectl => "Configuring kubectl for EKS...",
            Self::SettingUpClusterResources => "Setting up cluster resources...",
            Self::CloningRepository => "Cloning repository...",
            Self::SettingUpDockerfile => "Setting up Dockerfile...",
            Self::BuildingImage => "Building Docker image...",
            Self::PushingImage => "Pushing to Docker registry...",
            Self::CreatingNamespace => "Creating Kubernetes namespace...",
            Self::DeployingApplication => "Deploying application...",
            Self::WaitingForLoadBalancer => "Waiting for Load Balancer...",
            Self::Completed => "Deployment completed!",
        }
    }

    /// All steps in emission order.
    #[must_use]
    pub fn all() -> [Self; 10] {
        [
            Self::ConfiguringKubectl,
            Self::SettingUpClusterResources,
            Self::CloningRepository,
            Self::SettingUpDockerfile,
            Self::BuildingImage,
            Self::PushingImage,
            Self::CreatingNamespace,
            Self::DeployingApplication,
            Self::WaitingForLoadBalancer,
            Self::Completed,
        ]
    }
}

impl std::fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Receiver for progress notifications.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, step: ProgressStep);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_the_canonical_literals() {
        let expected = [
            "Configuring kubectl for EKS...",
            "Setting up cluster resources...",
            "Cloning repository...",
            "Setting up Dockerfile...",
            "Building Docker image...",
            "Pushing to Docker registry...",
            "Creating Kubernetes namespace...",
            "Deploying application...",
            "Waiting for Load Balancer...",
            "Deployment completed!",
        ];
        let actual: Vec<&str> = ProgressStep::all().iter().map(|s| s.message()).collect();
        assert_eq!(actual, expected);
    }
}
