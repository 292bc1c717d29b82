//! BDD tests for the refresh pipeline runner.
//!
//! These drive the real seven-step pipeline with a scripted executor:
//! - Scenario A: every step succeeds
//! - Scenario B: the panel build exits 2
//! - Scenario C: the performance history build exits 1
//! - Invocation shape, ordering and success-message gating

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use refresh_core::{default_pipeline, Pipeline, RunState, Step, DEFAULT_INTERPRETER};
use refresh_runner::{
    execute_run, run_pipeline, NoProgress, RunError, StdoutProgress, StepExecutor, Termination,
};

// ── Fixtures ─────────────────────────────────────────────────────────

/// Executor that exits with a per-step code and records each invocation.
struct FakeExecutor {
    exit_codes: Vec<i32>,
    invocations: RefCell<Vec<(Vec<String>, PathBuf)>>,
}

impl FakeExecutor {
    fn all_ok() -> Self {
        Self::with_codes(vec![0; 7])
    }

    fn failing_at(index: usize, code: i32) -> Self {
        let mut codes = vec![0; 7];
        codes[index] = code;
        Self::with_codes(codes)
    }

    fn with_codes(exit_codes: Vec<i32>) -> Self {
        Self {
            exit_codes,
            invocations: RefCell::new(Vec::new()),
        }
    }

    fn launched(&self) -> usize {
        self.invocations.borrow().len()
    }
}

impl StepExecutor for FakeExecutor {
    fn execute(&self, step: &Step) -> io::Result<Termination> {
        let mut calls = self.invocations.borrow_mut();
        let index = calls.len();
        calls.push((
            step.command().iter().map(|s| s.to_string()).collect(),
            step.working_dir.clone(),
        ));
        Ok(Termination::Exited(self.exit_codes[index]))
    }
}

/// Console reporter writing into memory; the same type the binary prints with.
type Console = StdoutProgress<Vec<u8>>;

fn console() -> Console {
    StdoutProgress::with_writer(Vec::new())
}

/// Non-empty console lines, in order.
fn lines(console: Console) -> Vec<String> {
    String::from_utf8(console.into_inner())
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn count(lines: &[String], prefix: &str) -> usize {
    lines.iter().filter(|l| l.starts_with(prefix)).count()
}

fn root() -> PathBuf {
    PathBuf::from("/srv/market-data")
}

fn pipeline() -> Pipeline {
    default_pipeline(&root(), DEFAULT_INTERPRETER)
}

fn expected_announcements(n: usize) -> Vec<String> {
    pipeline()
        .steps()
        .iter()
        .take(n)
        .map(|s| format!("[RUN] {}", s.command_line()))
        .collect()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn bdd_scenario_a_all_steps_succeed() {
    // GIVEN seven steps that all exit 0
    let exec = FakeExecutor::all_ok();
    let progress = console();

    // WHEN the pipeline runs
    let summary = run_pipeline(&pipeline(), &exec, &progress).expect("run should succeed");

    // THEN seven announcements print in declared order, then one [OK]
    let mut expected = expected_announcements(7);
    expected.push("[OK] All updates completed.".into());
    assert_eq!(lines(progress), expected);
    assert_eq!(summary.steps.len(), 7);
    assert_eq!(exec.launched(), 7);
}

#[test]
fn bdd_scenario_b_panel_build_fails() {
    // GIVEN the panel build (step 3) exits 2
    let exec = FakeExecutor::failing_at(2, 2);
    let progress = console();

    // WHEN the pipeline runs
    let err = run_pipeline(&pipeline(), &exec, &progress).unwrap_err();

    // THEN steps 1-3 are announced, nothing after, and no [OK]
    assert_eq!(lines(progress), expected_announcements(3));
    assert_eq!(exec.launched(), 3);

    // AND the error names step 3's command and code 2
    assert_eq!(
        err.to_string(),
        "Command failed with exit code 2: python3 scripts/06.1_build_backtest_panels.py"
    );
    match err {
        RunError::StepFailed {
            step, termination, ..
        } => {
            assert_eq!(step, "build_panels");
            assert_eq!(termination.code(), Some(2));
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
}

#[test]
fn bdd_scenario_c_last_step_fails() {
    // GIVEN steps 1-6 succeed and the performance history build exits 1
    let exec = FakeExecutor::failing_at(6, 1);
    let progress = console();

    // WHEN the pipeline runs
    let report = execute_run(&pipeline(), &exec, &progress);

    // THEN all seven announcements print and only step 7 is reported failed
    assert_eq!(lines(progress), expected_announcements(7));
    assert_eq!(report.state, RunState::Failed(6));
    assert_eq!(report.completed.len(), 6);
    let err = report.error.expect("run should fail");
    assert_eq!(err.step_id(), Some("build_performance_history"));
    assert!(err.to_string().contains("exit code 1"));
}

// ── Invariants ───────────────────────────────────────────────────────

#[test]
fn every_step_gets_root_and_no_extra_arguments() {
    let exec = FakeExecutor::all_ok();
    run_pipeline(&pipeline(), &exec, &NoProgress).unwrap();

    let calls = exec.invocations.borrow();
    for ((argv, cwd), step) in calls.iter().zip(pipeline().steps()) {
        assert_eq!(cwd, &root());
        assert_eq!(argv.len(), 2);
        assert_eq!(argv[0], DEFAULT_INTERPRETER);
        assert_eq!(argv[1], step.args[0]);
    }
}

#[test]
fn invocation_shape_is_identical_across_runs() {
    let first = FakeExecutor::all_ok();
    let second = FakeExecutor::all_ok();
    run_pipeline(&pipeline(), &first, &NoProgress).unwrap();
    run_pipeline(&pipeline(), &second, &NoProgress).unwrap();
    assert_eq!(*first.invocations.borrow(), *second.invocations.borrow());
}

#[test]
fn declared_script_order() {
    let exec = FakeExecutor::all_ok();
    run_pipeline(&pipeline(), &exec, &NoProgress).unwrap();

    let scripts: Vec<String> = exec
        .invocations
        .borrow()
        .iter()
        .map(|(argv, _)| argv[1].clone())
        .collect();
    assert_eq!(
        scripts,
        vec![
            "scripts/02_backfill_tiingo_from_2012.py",
            "scripts/01_backfill_fred_from_2012.py",
            "scripts/06.1_build_backtest_panels.py",
            "scripts/06_build_daily_state.py",
            "scripts/07_build_daily_state_history.py",
            "scripts/07.1_build_portfolio_targets_history.py",
            "scripts/08_build_portfolio_performance_history.py",
        ]
    );
}

#[test]
fn custom_interpreter_is_used_for_every_step() {
    let pipeline = default_pipeline(Path::new("/repo"), "/opt/venv/bin/python");
    let exec = FakeExecutor::all_ok();
    run_pipeline(&pipeline, &exec, &NoProgress).unwrap();
    assert!(exec
        .invocations
        .borrow()
        .iter()
        .all(|(argv, _)| argv[0] == "/opt/venv/bin/python"));
}

proptest! {
    /// If step k fails, steps after k are never launched and no [OK] is emitted.
    #[test]
    fn fail_fast(k in 0usize..7, code in prop_oneof![1i32..=255, -255i32..=-1]) {
        let exec = FakeExecutor::failing_at(k, code);
        let progress = console();

        let report = execute_run(&pipeline(), &exec, &progress);

        let printed = lines(progress);
        prop_assert_eq!(exec.launched(), k + 1);
        prop_assert_eq!(count(&printed, "[RUN]"), k + 1);
        prop_assert_eq!(count(&printed, "[OK]"), 0);
        prop_assert_eq!(report.state, RunState::Failed(k));
        prop_assert_eq!(report.completed.len(), k);
        prop_assert!(report.error.is_some());
    }

    /// The success message appears iff every step exits 0.
    #[test]
    fn success_message_gating(codes in proptest::collection::vec(prop_oneof![3 => Just(0i32), 1 => 1i32..4], 7)) {
        let all_zero = codes.iter().all(|&c| c == 0);
        let exec = FakeExecutor::with_codes(codes);
        let progress = console();

        let result = run_pipeline(&pipeline(), &exec, &progress);

        prop_assert_eq!(result.is_ok(), all_zero);
        prop_assert_eq!(count(&lines(progress), "[OK]"), usize::from(all_zero));
    }
}
