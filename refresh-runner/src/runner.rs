//! Pipeline runner — executes steps one at a time, stopping at the first failure.
//!
//! Two entry points:
//! - `run_step()`: launch a single step and turn a non-zero exit into an error.
//! - `run_pipeline()`: validate the pipeline, then drive every step through the
//!   run state machine. Used by the CLI.
//!
//! `execute_run()` is the lower-level form that always returns a `RunReport`
//! (including partial progress on failure) so the outcome can be journaled.

use std::io;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use refresh_core::{Pipeline, PipelineError, Run, RunState, StateError, Step};

use crate::executor::{StepExecutor, Termination};
use crate::progress::RunProgress;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    /// A step ran and did not exit 0.
    #[error("Command failed with {termination}: {command}")]
    StepFailed {
        step: String,
        command: String,
        termination: Termination,
    },

    /// A step could not be launched at all.
    #[error("Failed to launch {command}: {source}")]
    Spawn {
        step: String,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("run state error: {0}")]
    State(#[from] StateError),
}

impl RunError {
    /// Id of the step that failed, for step-level errors.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            RunError::StepFailed { step, .. } | RunError::Spawn { step, .. } => Some(step.as_str()),
            RunError::Pipeline(_) | RunError::State(_) => None,
        }
    }
}

/// Outcome of one successful step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    pub command: String,
    pub termination: Termination,
    pub elapsed: Duration,
}

/// Summary of a fully successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

/// Everything known about a finished run, successful or not.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fingerprint: String,
    pub state: RunState,
    /// Reports for the steps that succeeded, in execution order.
    pub completed: Vec<StepReport>,
    pub elapsed: Duration,
    pub error: Option<RunError>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    pub fn into_result(self) -> Result<RunSummary, RunError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(RunSummary {
                steps: self.completed,
                elapsed: self.elapsed,
            }),
        }
    }
}

/// Launch `step`, block until it terminates, and fail on any non-zero exit.
pub fn run_step(executor: &dyn StepExecutor, step: &Step) -> Result<StepReport, RunError> {
    let command = step.command_line();
    let started = Instant::now();

    let termination = executor
        .execute(step)
        .map_err(|source| RunError::Spawn {
            step: step.id.clone(),
            command: command.clone(),
            source,
        })?;

    if !termination.success() {
        return Err(RunError::StepFailed {
            step: step.id.clone(),
            command,
            termination,
        });
    }

    Ok(StepReport {
        step: step.id.clone(),
        command,
        termination,
        elapsed: started.elapsed(),
    })
}

/// Run every step of `pipeline` in order and return the summary, or the first error.
///
/// The success callback fires only when all steps exited 0.
pub fn run_pipeline(
    pipeline: &Pipeline,
    executor: &dyn StepExecutor,
    progress: &dyn RunProgress,
) -> Result<RunSummary, RunError> {
    execute_run(pipeline, executor, progress).into_result()
}

/// Run the pipeline and report how far it got.
pub fn execute_run(
    pipeline: &Pipeline,
    executor: &dyn StepExecutor,
    progress: &dyn RunProgress,
) -> RunReport {
    let started_at = Utc::now();
    let clock = Instant::now();
    let mut run = Run::new(pipeline.len());
    let mut completed = Vec::with_capacity(pipeline.len());

    let error = drive(pipeline, executor, progress, &mut run, &mut completed).err();

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        fingerprint: pipeline.fingerprint(),
        state: run.state(),
        completed,
        elapsed: clock.elapsed(),
        error,
    };

    if report.succeeded() {
        progress.on_run_complete(&RunSummary {
            steps: report.completed.clone(),
            elapsed: report.elapsed,
        });
    }

    report
}

fn drive(
    pipeline: &Pipeline,
    executor: &dyn StepExecutor,
    progress: &dyn RunProgress,
    run: &mut Run,
    completed: &mut Vec<StepReport>,
) -> Result<(), RunError> {
    pipeline.validate()?;

    let total = pipeline.len();
    let steps = pipeline.steps();
    run.start()?;

    while let Some(index) = run.current() {
        let step = &steps[index];
        progress.on_step_start(step, index, total);
        log::debug!("launching {} in {}", step.id, step.working_dir.display());

        let result = run_step(executor, step);
        progress.on_step_complete(step, index, total, &result);

        match result {
            Ok(report) => {
                completed.push(report);
                run.step_succeeded()?;
            }
            Err(e) => {
                run.step_failed()?;
                return Err(e);
            }
        }
    }

    Ok(())
}
