//! The ordered refresh pipeline.
//!
//! Step order encodes a dependency DAG that happens to be a total order: every
//! step reads only outputs written by steps declared before it. In particular
//! the current daily state is built before the state history so that the
//! history build of the same run already includes today's state.
//!
//! [`Pipeline::validate`] checks the declared order against the declared
//! dependencies so a reordering is caught before any process is spawned.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::step::{Phase, Step};

/// Default program used to run each step script.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Errors from pipeline validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pipeline has no steps")]
    Empty,

    #[error("duplicate step id '{0}'")]
    DuplicateStep(String),

    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("step '{step}' (position {position}) depends on '{dependency}' declared at position {dependency_position}")]
    DependencyOutOfOrder {
        step: String,
        position: usize,
        dependency: String,
        dependency_position: usize,
    },
}

/// An ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Build a pipeline and validate it in one go.
    pub fn try_new(steps: Vec<Step>) -> Result<Self, PipelineError> {
        let pipeline = Self::new(steps);
        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Check that every dependency is declared strictly before its dependent.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            if positions.insert(step.id.as_str(), i).is_some() {
                return Err(PipelineError::DuplicateStep(step.id.clone()));
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                let Some(&dep_pos) = positions.get(dep.as_str()) else {
                    return Err(PipelineError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                };
                if dep_pos >= i {
                    return Err(PipelineError::DependencyOutOfOrder {
                        step: step.id.clone(),
                        position: i,
                        dependency: dep.clone(),
                        dependency_position: dep_pos,
                    });
                }
            }
        }

        Ok(())
    }

    /// Deterministic BLAKE3 digest of the invocation shape (argv and cwd, in order).
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for step in &self.steps {
            for part in step.command() {
                hasher.update(part.as_bytes());
                hasher.update(&[0]);
            }
            hasher.update(step.working_dir.to_string_lossy().as_bytes());
            hasher.update(&[0xff]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// The data refresh pipeline: seven steps in six phases, all run from `root`.
pub fn default_pipeline(root: &Path, interpreter: &str) -> Pipeline {
    let script = |id: &str, label: &str, phase: Phase, path: &str| {
        Step::new(id, label, phase, interpreter, root).arg(path)
    };

    Pipeline::new(vec![
        script(
            "backfill_prices",
            "Backfill daily prices (incremental)",
            Phase::Ingest,
            "scripts/02_backfill_tiingo_from_2012.py",
        ),
        script(
            "backfill_macro",
            "Backfill macro series (incremental)",
            Phase::Ingest,
            "scripts/01_backfill_fred_from_2012.py",
        ),
        script(
            "build_panels",
            "Build backtest panels",
            Phase::Panels,
            "scripts/06.1_build_backtest_panels.py",
        )
        .after(&["backfill_prices", "backfill_macro"]),
        script(
            "build_daily_state",
            "Build current daily state",
            Phase::CurrentState,
            "scripts/06_build_daily_state.py",
        )
        .after(&["build_panels"]),
        script(
            "build_state_history",
            "Build daily state history",
            Phase::StateHistory,
            "scripts/07_build_daily_state_history.py",
        )
        .after(&["build_daily_state"]),
        script(
            "build_targets_history",
            "Build portfolio targets history",
            Phase::TargetHistory,
            "scripts/07.1_build_portfolio_targets_history.py",
        )
        .after(&["build_state_history", "build_panels"]),
        script(
            "build_performance_history",
            "Build portfolio performance history",
            Phase::PerformanceHistory,
            "scripts/08_build_portfolio_performance_history.py",
        )
        .after(&["build_state_history", "build_targets_history", "build_panels"]),
    ])
}
