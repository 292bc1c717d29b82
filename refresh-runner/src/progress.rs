//! Progress callbacks for pipeline runs.

use std::cell::RefCell;
use std::io::{self, Write};

use refresh_core::Step;

use crate::runner::{RunError, RunSummary, StepReport};

/// Progress callback for a pipeline run.
pub trait RunProgress {
    /// Called right before a step is launched.
    fn on_step_start(&self, step: &Step, index: usize, total: usize);

    /// Called when a step has terminated (or failed to launch).
    fn on_step_complete(
        &self,
        step: &Step,
        index: usize,
        total: usize,
        result: &Result<StepReport, RunError>,
    );

    /// Called once, only when every step succeeded.
    fn on_run_complete(&self, summary: &RunSummary);
}

/// Console reporter: one `[RUN]` line per step, one `[OK]` line at the end.
///
/// Writes to stdout by default. Every line is flushed before the step is
/// launched so it lands ahead of the child's own output on the shared stream.
/// Failures are not printed here; the error propagates to the caller.
pub struct StdoutProgress<W: Write = io::Stdout> {
    out: RefCell<W>,
}

impl StdoutProgress {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdoutProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdoutProgress<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn line(&self, text: &str) {
        let mut out = self.out.borrow_mut();
        if let Err(e) = writeln!(out, "\n{text}").and_then(|()| out.flush()) {
            log::warn!("could not write progress line: {e}");
        }
    }
}

impl<W: Write> RunProgress for StdoutProgress<W> {
    fn on_step_start(&self, step: &Step, _index: usize, _total: usize) {
        self.line(&format!("[RUN] {}", step.command_line()));
    }

    fn on_step_complete(
        &self,
        step: &Step,
        index: usize,
        total: usize,
        result: &Result<StepReport, RunError>,
    ) {
        if let Ok(report) = result {
            log::info!(
                "[{}/{}] {} finished in {:.1}s",
                index + 1,
                total,
                step.id,
                report.elapsed.as_secs_f64()
            );
        }
    }

    fn on_run_complete(&self, _summary: &RunSummary) {
        self.line("[OK] All updates completed.");
    }
}

/// Reporter that prints nothing.
pub struct NoProgress;

impl RunProgress for NoProgress {
    fn on_step_start(&self, _step: &Step, _index: usize, _total: usize) {}

    fn on_step_complete(
        &self,
        _step: &Step,
        _index: usize,
        _total: usize,
        _result: &Result<StepReport, RunError>,
    ) {
    }

    fn on_run_complete(&self, _summary: &RunSummary) {}
}
