//! External command execution for Gitship.
//!
//! Everything Gitship does against the outside world (git, docker, kubectl,
//! helm, aws/eksctl) goes through [`CommandRunner`], so orchestration code can
//! be tested against a scripted runner. The `tools` module layers typed,
//! one-method-per-operation clients over the runner so no component ever
//! concatenates shell strings.

pub mod runner;
pub mod tools;

pub use runner::{Cmd, CommandOutput, CommandRunner, ExecutionError, ProcessRunner};
pub use tools::{Aws, Docker, Git, Helm, Kubectl};
