//! Refresh CLI — run every data refresh step in dependency order.
//!
//! Takes no options: the step list and its order are fixed. The binary must be
//! copied (not symlinked) to `<repo>/scripts/refresh`: the repository root is
//! resolved from the executable's real location, with symlinks already
//! followed, and used as the working directory of every step.
//!
//! Optional `<repo>/refresh.toml` sets the interpreter and a run history file.
//! Diagnostics go to stderr at the level given by `REFRESH_LOG` (default `warn`).

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use refresh_core::{default_pipeline, resolve_root, RefreshConfig};
use refresh_runner::{execute_run, ProcessExecutor, RunHistory, RunRecord, StdoutProgress};

const LOG_ENV: &str = "REFRESH_LOG";

#[derive(Parser)]
#[command(
    name = "refresh",
    version,
    about = "Refresh market data and rebuild derived state, stopping at the first failure"
)]
struct Cli {}

fn main() -> Result<()> {
    let _cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "warn")).init();

    let exe = std::env::current_exe().context("locate refresh executable")?;
    let root = resolve_root(&exe);
    log::debug!("repository root: {}", root.display());

    let config = RefreshConfig::load(&root)?;
    log::debug!("interpreter: {}", config.interpreter);

    let pipeline = default_pipeline(&root, &config.interpreter);
    pipeline.validate().context("refresh pipeline is misordered")?;

    let report = execute_run(&pipeline, &ProcessExecutor, &StdoutProgress::new());

    if let Some(path) = config.history_path(&root) {
        record_history(&path, &RunRecord::from(&report));
    }

    report.into_result()?;
    Ok(())
}

/// Journal the run. Failures are logged and never change the exit status.
fn record_history(path: &Path, record: &RunRecord) {
    let history = RunHistory::new(path.to_path_buf());
    if let Err(e) = history.append(record) {
        log::warn!("could not write run history to {}: {e}", path.display());
    }
}
