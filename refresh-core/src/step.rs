//! Step and phase types.
//!
//! A step is one external command run as an atomic unit of the pipeline. Steps
//! are built once at startup and never mutated; identity is the position in the
//! pipeline, the id only exists to express dependencies and to label history.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Conceptual grouping of steps, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Raw data refresh from external sources (incremental).
    Ingest,
    /// Panels and derived time series used by backtests and diagnostics.
    Panels,
    /// Current-day derived state.
    CurrentState,
    /// Historical state series, including the current state.
    StateHistory,
    /// Target series derived from state history and panels.
    TargetHistory,
    /// Performance history over targets, history and panels.
    PerformanceHistory,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Ingest,
        Phase::Panels,
        Phase::CurrentState,
        Phase::StateHistory,
        Phase::TargetHistory,
        Phase::PerformanceHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Ingest => "ingest",
            Phase::Panels => "panels",
            Phase::CurrentState => "current_state",
            Phase::StateHistory => "state_history",
            Phase::TargetHistory => "target_history",
            Phase::PerformanceHistory => "performance_history",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external command invocation plus the metadata needed to order it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub label: String,
    pub phase: Phase,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Ids of steps whose outputs this step reads.
    pub depends_on: Vec<String>,
}

impl Step {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        phase: Phase,
        program: impl Into<String>,
        working_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            phase,
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.as_ref().to_path_buf(),
            depends_on: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn after(mut self, ids: &[&str]) -> Self {
        self.depends_on.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    /// Full argv: program followed by its arguments.
    pub fn command(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Space-joined command line, as announced on the console and in errors.
    pub fn command_line(&self) -> String {
        self.command().join(" ")
    }
}
