//! Test support: a scripted command runner.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gitship_exec::{Cmd, CommandOutput, CommandRunner, ExecutionError};

type Handler = Box<dyn Fn(&Cmd) -> Result<CommandOutput, ExecutionError> + Send + Sync>;

/// A [`CommandRunner`] whose responses come from a closure, recording every
/// invocation for assertions.
pub struct FakeRunner {
    calls: Mutex<Vec<Cmd>>,
    handler: Handler,
}

impl FakeRunner {
    pub fn new(
        handler: impl Fn(&Cmd) -> Result<CommandOutput, ExecutionError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    /// Every command succeeds with the given stdout.
    pub fn succeeding_all(stdout: &str) -> Arc<Self> {
        let stdout = stdout.to_string();
        Self::new(move |_| Ok(ok_output(&stdout)))
    }

    /// Every command fails with the given stderr.
    pub fn failing_all(stderr: &str) -> Arc<Self> {
        let stderr = stderr.to_string();
        Self::new(move |cmd| {
            Err(ExecutionError::Failed {
                command: cmd.display_line(),
                stderr: stderr.clone(),
            })
        })
    }

    /// Upcast for components that take `Arc<dyn CommandRunner>`.
    pub fn arc(self: &Arc<Self>) -> Arc<dyn CommandRunner> {
        Arc::clone(self) as Arc<dyn CommandRunner>
    }

    /// Snapshot of all commands run so far.
    pub fn calls(&self) -> Vec<Cmd> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded invocations of `program` whose first argument is
    /// `subcommand`.
    pub fn count_invocations(&self, program: &str, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|cmd| {
                cmd.program() == program
                    && cmd.arg_list().first().map(String::as_str) == Some(subcommand)
            })
            .count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, cmd: Cmd) -> Result<CommandOutput, ExecutionError> {
        self.calls.lock().unwrap().push(cmd.clone());
        (self.handler)(&cmd)
    }
}

/// A successful [`CommandOutput`] with the given stdout.
pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// A non-zero-exit [`ExecutionError`] with the given stderr.
pub fn failed(command: &str, stderr: &str) -> ExecutionError {
    ExecutionError::Failed {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}
