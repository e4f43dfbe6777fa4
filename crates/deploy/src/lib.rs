//! Gitship deployment orchestration.
//!
//! Takes a public HTTPS git repository and turns it into a running service on
//! an EKS cluster: clone, synthesize a Dockerfile when the project carries
//! none, build and push the image, apply a Deployment/Service/Ingress into a
//! repository-derived namespace, wait for the ALB hostname, and persist a
//! deployment record.
//!
//! The pipeline is strictly sequential; inner components own their own
//! retries (image push, endpoint polling). Cluster-level prerequisites are
//! ensured best-effort before each run. Local staging state is removed on
//! every exit path.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod diagnostics;
pub mod dockerfile;
pub mod endpoint;
pub mod error;
pub mod image;
pub mod manifest;
pub mod names;
pub mod orchestrator;
pub mod progress;
pub mod record;
pub mod retry;
pub mod staging;
pub mod store;
pub mod workload;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::DeployConfig;
pub use error::{DeployError, DeployFailure};
pub use orchestrator::{DeployOutcome, DeployRequest, DeploymentOrchestrator};
pub use progress::{ProgressSink, ProgressStep};
pub use record::{DeploymentRecord, DeploymentStatus, RecordSink};
pub use store::JsonlStore;
