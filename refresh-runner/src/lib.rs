//! Refresh Runner — sequential, fail-fast execution of the refresh pipeline.
//!
//! This crate builds on `refresh-core` to provide:
//! - The `StepExecutor` seam and a process-backed executor with inherited stdio
//! - `run_step` / `run_pipeline`, driven by the core run state machine
//! - Console progress reporting
//! - JSONL run history

pub mod executor;
pub mod history;
pub mod progress;
pub mod runner;

pub use executor::{ProcessExecutor, StepExecutor, Termination};
pub use history::{HistoryError, RunHistory, RunOutcome, RunRecord, StepTiming};
pub use progress::{NoProgress, RunProgress, StdoutProgress};
pub use runner::{execute_run, run_pipeline, run_step, RunError, RunReport, RunSummary, StepReport};
