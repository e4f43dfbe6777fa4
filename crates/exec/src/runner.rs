//! Command runner: executes a single external command and classifies the
//! outcome.
//!
//! Every invocation is a fully-structured [`Cmd`] (program + argument vector,
//! never a shell string). The runner logs a before/after line for each command
//! unless the command is marked quiet, which the endpoint resolver uses for
//! its high-frequency ingress polls.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Errors raised by external command execution.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// Command ran and exited non-zero.
    #[error("command `{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },

    /// Command did not finish within its timeout and was killed.
    #[error("command `{command}` timed out after {timeout_secs}s")]
    TimedOut { command: String, timeout_secs: u64 },

    /// Command could not be spawned at all (missing binary, bad permissions).
    #[error("failed to spawn `{command}`: {message}")]
    Spawn { command: String, message: String },
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Primary text of the command: stdout, falling back to stderr when
    /// stdout is empty. Some CLIs (notably docker and eksctl) write their
    /// informational output to stderr on success.
    #[must_use]
    pub fn text(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// A fully-formed external command invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    stdin: Option<String>,
    timeout: Option<Duration>,
    quiet: bool,
}

impl Cmd {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdin: None,
            timeout: None,
            quiet: false,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable override for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Feed this payload to the child's stdin (used for `kubectl apply -f -`
    /// and `docker login --password-stdin`). The payload is never logged.
    #[must_use]
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Kill the child and fail with [`ExecutionError::TimedOut`] if it runs
    /// longer than this.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Suppress the per-command info logs. Used for polling commands that
    /// would otherwise flood the log.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// One-line rendering for logs and error messages. Stdin payloads and
    /// env values are deliberately omitted.
    #[must_use]
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Object-safe seam for command execution.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] on spawn failure, non-zero exit, or
    /// timeout.
    async fn run(&self, cmd: Cmd) -> Result<CommandOutput, ExecutionError>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cmd: Cmd) -> Result<CommandOutput, ExecutionError> {
        let line = cmd.display_line();
        if cmd.quiet {
            debug!(command = %line, "Running command");
        } else {
            info!(command = %line, "Running command");
        }

        let mut child = tokio::process::Command::new(&cmd.program)
            .args(&cmd.args)
            .envs(cmd.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::Spawn {
                command: line.clone(),
                message: e.to_string(),
            })?;

        if let Some(payload) = &cmd.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(payload.as_bytes())
                    .await
                    .map_err(|e| ExecutionError::Spawn {
                        command: line.clone(),
                        message: format!("failed to write stdin: {e}"),
                    })?;
                // Close stdin so the child sees EOF.
                drop(stdin);
            }
        }

        let wait = child.wait_with_output();
        let output = match cmd.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result,
                // Dropping the wait future drops the child, and kill_on_drop
                // terminates the process.
                Err(_) => {
                    return Err(ExecutionError::TimedOut {
                        command: line,
                        timeout_secs: limit.as_secs(),
                    })
                }
            },
            None => wait.await,
        }
        .map_err(|e| ExecutionError::Spawn {
            command: line.clone(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let code = output.status.code();
            if !cmd.quiet {
                debug!(command = %line, exit = ?code, "Command failed");
            }
            return Err(ExecutionError::Failed {
                command: line,
                stderr: if stderr.trim().is_empty() {
                    format!("exit status {code:?}")
                } else {
                    stderr.trim().to_string()
                },
            });
        }

        if cmd.quiet {
            debug!(command = %line, "Command succeeded");
        } else {
            info!(command = %line, "Command succeeded");
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_line_joins_program_and_args() {
        let cmd = Cmd::new("kubectl").args(["get", "pods", "-n", "widget"]);
        assert_eq!(cmd.display_line(), "kubectl get pods -n widget");
        assert_eq!(Cmd::new("docker").display_line(), "docker");
    }

    #[test]
    fn output_text_falls_back_to_stderr() {
        let out = CommandOutput {
            stdout: "  \n".into(),
            stderr: "pushed ok".into(),
        };
        assert_eq!(out.text(), "pushed ok");

        let out = CommandOutput {
            stdout: "real output".into(),
            stderr: "noise".into(),
        };
        assert_eq!(out.text(), "real output");
    }

    #[tokio::test]
    async fn runs_a_real_command_and_captures_stdout() {
        let runner = ProcessRunner::new();
        let out = runner
            .run(Cmd::new("echo").arg("hello"))
            .await
            .expect("echo should succeed");
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure_with_stderr() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(Cmd::new("ls").arg("/definitely/not/a/path"))
            .await
            .expect_err("ls of missing path should fail");
        match err {
            ExecutionError::Failed { command, stderr } => {
                assert!(command.starts_with("ls"));
                assert!(!stderr.is_empty());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(Cmd::new("gitship-no-such-binary-xyz"))
            .await
            .expect_err("spawn should fail");
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(
                Cmd::new("sleep")
                    .arg("30")
                    .timeout(Duration::from_millis(100)),
            )
            .await
            .expect_err("sleep should be killed");
        assert!(matches!(err, ExecutionError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn env_override_reaches_the_child() {
        let runner = ProcessRunner::new();
        let out = runner
            .run(
                Cmd::new("printenv")
                    .arg("GITSHIP_EXEC_TEST_VAR")
                    .env("GITSHIP_EXEC_TEST_VAR", "propagated"),
            )
            .await
            .expect("printenv should succeed");
        assert_eq!(out.stdout.trim(), "propagated");
    }

    #[tokio::test]
    async fn stdin_payload_reaches_the_child() {
        let runner = ProcessRunner::new();
        let out = runner
            .run(Cmd::new("cat").stdin("piped payload"))
            .await
            .expect("cat should succeed");
        assert_eq!(out.stdout, "piped payload");
    }
}
