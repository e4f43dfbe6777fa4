//! Error taxonomy for the deployment pipeline.

use thiserror::Error;

use gitship_exec::ExecutionError;

/// Errors that can abort a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Caller could not be authenticated. 401-equivalent.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Request or configuration failed validation. 4xx-equivalent, never
    /// retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An external command exited non-zero, timed out, or could not spawn.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Workload manifest could not be rendered.
    #[error("failed to render manifest: {0}")]
    Manifest(String),

    /// Registry push failed on every attempt.
    #[error("failed to push image after {attempts} attempts: {last}")]
    PushExhausted {
        attempts: u32,
        #[source]
        last: ExecutionError,
    },

    /// The record sink rejected the deployment record.
    #[error("failed to persist deployment record: {0}")]
    Record(String),
}

impl DeployError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// HTTP-equivalent status for the inbound contract.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Validation(_) => 400,
            _ => 500,
        }
    }
}

/// Remediation suggestions attached to every user-visible failure. Generic
/// by design: the diagnostics sweep is heuristic, not root-caused.
pub const SUGGESTED_ACTIONS: [&str; 4] = [
    "Verify the repository URL is accessible and contains a buildable application",
    "Check that Docker registry credentials are configured correctly",
    "Confirm the EKS cluster is reachable with current AWS credentials",
    "Re-run the deployment; transient network failures often resolve on retry",
];

/// User-visible failure report for a deployment run.
#[derive(Debug)]
pub struct DeployFailure {
    /// Root error that aborted the pipeline.
    pub error: DeployError,
    /// Static remediation suggestions.
    pub suggested_actions: [&'static str; 4],
    /// Best-effort diagnostics sweep output, if one could be gathered.
    pub diagnostics: Option<String>,
}

impl DeployFailure {
    #[must_use]
    pub fn new(error: DeployError, diagnostics: Option<String>) -> Self {
        Self {
            error,
            suggested_actions: SUGGESTED_ACTIONS,
            diagnostics,
        }
    }

    /// HTTP-equivalent status for the inbound contract.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.error.status_code()
    }
}

impl std::fmt::Display for DeployFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Deployment failed: {}", self.error)?;
        writeln!(f, "Suggested actions:")?;
        for action in &self.suggested_actions {
            writeln!(f, "  - {action}")?;
        }
        if let Some(ref diag) = self.diagnostics {
            writeln!(f, "Diagnostics:\n{diag}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DeployFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_inbound_contract() {
        assert_eq!(
            DeployError::Unauthorized("no token".into()).status_code(),
            401
        );
        assert_eq!(DeployError::Validation("bad url".into()).status_code(), 400);
        assert_eq!(
            DeployError::Record("sink unavailable".into()).status_code(),
            500
        );
    }

    #[test]
    fn failure_display_includes_suggestions() {
        let failure = DeployFailure::new(DeployError::Validation("bad url".into()), None);
        let text = failure.to_string();
        assert!(text.contains("Deployment failed"));
        assert!(text.contains("Suggested actions"));
        for action in SUGGESTED_ACTIONS {
            assert!(text.contains(action));
        }
    }
}
