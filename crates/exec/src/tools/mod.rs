//! Typed clients for the external tools Gitship drives.
//!
//! One method per operation, structured arguments only. The clients share a
//! [`CommandRunner`](crate::CommandRunner) so tests can script every
//! interaction.

mod aws;
mod docker;
mod git;
mod helm;
mod kubectl;

pub use aws::Aws;
pub use docker::Docker;
pub use git::Git;
pub use helm::Helm;
pub use kubectl::Kubectl;
