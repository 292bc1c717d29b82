//! Run history — JSONL append-only journal of finished runs.
//!
//! One JSON object per line, so a partially written line never corrupts the
//! rest of the file and the journal is easy to stream. Writing history is best
//! effort for callers: a failed append must not change the run outcome.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::Termination;
use crate::runner::{RunError, RunReport};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("history serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Elapsed time of one successful step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTiming {
    pub step: String,
    pub elapsed_ms: u64,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed {
        step: Option<String>,
        command: Option<String>,
        termination: Option<Termination>,
        message: String,
    },
}

impl From<&RunError> for RunOutcome {
    fn from(err: &RunError) -> Self {
        let (command, termination) = match err {
            RunError::StepFailed {
                command,
                termination,
                ..
            } => (Some(command.clone()), Some(*termination)),
            RunError::Spawn { command, .. } => (Some(command.clone()), None),
            RunError::Pipeline(_) | RunError::State(_) => (None, None),
        };
        RunOutcome::Failed {
            step: err.step_id().map(String::from),
            command,
            termination,
            message: err.to_string(),
        }
    }
}

/// A single history line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fingerprint: String,
    pub outcome: RunOutcome,
    pub steps: Vec<StepTiming>,
}

impl From<&RunReport> for RunRecord {
    fn from(report: &RunReport) -> Self {
        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            fingerprint: report.fingerprint.clone(),
            outcome: match &report.error {
                None => RunOutcome::Succeeded,
                Some(e) => RunOutcome::from(e),
            },
            steps: report
                .completed
                .iter()
                .map(|r| StepTiming {
                    step: r.step.clone(),
                    elapsed_ms: u64::try_from(r.elapsed.as_millis()).unwrap_or(u64::MAX),
                })
                .collect(),
        }
    }
}

/// JSONL history file manager.
pub struct RunHistory {
    path: PathBuf,
}

impl RunHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one record, creating the file and its parent directory if needed.
    pub fn append(&self, record: &RunRecord) -> Result<(), HistoryError> {
        let json = serde_json::to_string(record)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }

    /// Read all records, skipping blank and malformed lines.
    pub fn read_all(&self) -> Result<Vec<RunRecord>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::debug!("skipping malformed history line: {e}"),
            }
        }
        Ok(records)
    }
}
