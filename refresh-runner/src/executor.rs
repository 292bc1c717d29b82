//! Step executors.
//!
//! The `StepExecutor` trait abstracts over how a step's command is launched so
//! the runner can be driven by real processes or mocked for tests. Executors
//! block until the step terminates and report how it terminated; deciding
//! whether that is a failure is the runner's job.

use std::fmt;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

use serde::{Deserialize, Serialize};

use refresh_core::Step;

/// How a step process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Termination {
    /// Normal exit with this status code.
    Exited(i32),
    /// Killed by this signal (Unix only).
    Signaled(i32),
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited(0))
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            Termination::Exited(code) => Some(*code),
            Termination::Signaled(_) => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exit code {code}"),
            Termination::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled(signal);
            }
        }
        Termination::Exited(-1)
    }
}

/// Launches one step and waits for it.
pub trait StepExecutor {
    /// Run `step` to completion. `Err` means the process could not be started.
    fn execute(&self, step: &Step) -> io::Result<Termination>;
}

/// Runs steps as child processes with inherited stdio.
///
/// Step output is relayed live to the invoking terminal; nothing is captured
/// or parsed. There is no timeout: a hung step hangs the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl StepExecutor for ProcessExecutor {
    fn execute(&self, step: &Step) -> io::Result<Termination> {
        let status = Command::new(&step.program)
            .args(&step.args)
            .current_dir(&step.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.into())
    }
}
