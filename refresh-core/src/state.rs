//! Run state machine.
//!
//! `NotStarted → Running(0) → Running(1) → … → Succeeded`, with any running
//! step able to move to `Failed`. `Succeeded` and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    /// Index of the step currently executing.
    Running(usize),
    Succeeded,
    /// Index of the step that failed.
    Failed(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("cannot start a run with no steps")]
    NoSteps,

    #[error("invalid transition: {action} from {from:?}")]
    InvalidTransition { from: RunState, action: &'static str },
}

/// Tracks one run over a fixed number of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    state: RunState,
    total: usize,
}

impl Run {
    pub fn new(total: usize) -> Self {
        Self {
            state: RunState::NotStarted,
            total,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Succeeded | RunState::Failed(_))
    }

    /// Index of the executing step, if any.
    pub fn current(&self) -> Option<usize> {
        match self.state {
            RunState::Running(i) => Some(i),
            _ => None,
        }
    }

    /// `NotStarted → Running(0)`.
    pub fn start(&mut self) -> Result<RunState, StateError> {
        match self.state {
            RunState::NotStarted if self.total == 0 => Err(StateError::NoSteps),
            RunState::NotStarted => self.set(RunState::Running(0)),
            from => Err(StateError::InvalidTransition {
                from,
                action: "start",
            }),
        }
    }

    /// The current step exited 0: move to the next step, or succeed after the last.
    pub fn step_succeeded(&mut self) -> Result<RunState, StateError> {
        match self.state {
            RunState::Running(i) if i + 1 < self.total => self.set(RunState::Running(i + 1)),
            RunState::Running(_) => self.set(RunState::Succeeded),
            from => Err(StateError::InvalidTransition {
                from,
                action: "step_succeeded",
            }),
        }
    }

    /// The current step failed: the run is over.
    pub fn step_failed(&mut self) -> Result<RunState, StateError> {
        match self.state {
            RunState::Running(i) => self.set(RunState::Failed(i)),
            from => Err(StateError::InvalidTransition {
                from,
                action: "step_failed",
            }),
        }
    }

    fn set(&mut self, next: RunState) -> Result<RunState, StateError> {
        self.state = next;
        Ok(next)
    }
}
