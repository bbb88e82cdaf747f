//! Process runner: the boundary between the launcher and external programs.
//!
//! Every program the launcher drives (GPU inventory, engine build, inference)
//! is described by a [`CommandSpec`] and executed through a [`ProcessRunner`].
//! Environment overrides live on the spec and are applied only to the child,
//! never to the launcher's own environment.

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A program invocation: program, arguments and per-child environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child only. A later value for the
    /// same key replaces the earlier one.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    /// Restrict the child to a single physical device, which it will see as device 0.
    pub fn visible_device(self, env_var: &str, index: u32) -> Self {
        self.env(env_var, index.to_string())
    }

    /// Look up an override set on this spec.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> RunnerError {
        RunnerError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn wait_error(&self, source: std::io::Error) -> RunnerError {
        RunnerError::Wait {
            program: self.program.clone(),
            source,
        }
    }
}

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, `None` when the child was killed by a signal.
    pub code: Option<i32>,
}

impl ExitReport {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Output captured from a child that ran to completion.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub exit: ExitReport,
    pub stdout: String,
    pub stderr: String,
}

/// Result of a run that the operator may cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited on its own.
    Exited(ExitReport),
    /// The operator interrupted the launcher; the child was left to tear itself down.
    Interrupted,
}

/// Runs external programs.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion with stdout/stderr captured.
    async fn output(&self, spec: &CommandSpec) -> Result<CapturedOutput, RunnerError>;

    /// Run to completion with inherited stdio.
    async fn status(&self, spec: &CommandSpec) -> Result<ExitReport, RunnerError>;

    /// Like [`status`](Self::status), but an operator interrupt ends the run cleanly.
    async fn status_or_interrupt(&self, spec: &CommandSpec) -> Result<RunOutcome, RunnerError> {
        self.status(spec).await.map(RunOutcome::Exited)
    }
}

/// Runs real subprocesses via `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn output(&self, spec: &CommandSpec) -> Result<CapturedOutput, RunnerError> {
        debug!(program = %spec.program, args = ?spec.args, "Capturing output");

        let out = spec
            .to_command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spec.spawn_error(e))?;

        Ok(CapturedOutput {
            exit: out.status.into(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    async fn status(&self, spec: &CommandSpec) -> Result<ExitReport, RunnerError> {
        debug!(program = %spec.program, args = ?spec.args, env = ?spec.env, "Running");

        let mut child = spec.to_command().spawn().map_err(|e| spec.spawn_error(e))?;
        let status = child.wait().await.map_err(|e| spec.wait_error(e))?;
        Ok(status.into())
    }

    async fn status_or_interrupt(&self, spec: &CommandSpec) -> Result<RunOutcome, RunnerError> {
        debug!(program = %spec.program, args = ?spec.args, env = ?spec.env, "Running (interruptible)");

        let mut child = spec.to_command().spawn().map_err(|e| spec.spawn_error(e))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| spec.wait_error(e))?;
                Ok(RunOutcome::Exited(status.into()))
            }
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => {
                        debug!(program = %spec.program, "Interrupted, waiting for child to exit");
                        // The child shares our terminal and received the same interrupt.
                        if let Err(e) = child.wait().await {
                            warn!(program = %spec.program, error = %e, "Failed to reap child after interrupt");
                        }
                        Ok(RunOutcome::Interrupted)
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not listen for interrupts");
                        let status = child.wait().await.map_err(|e| spec.wait_error(e))?;
                        Ok(RunOutcome::Exited(status.into()))
                    }
                }
            }
        }
    }
}
