//! Refresh Core — domain types for the data refresh pipeline.
//!
//! This crate holds everything that does not spawn a process:
//! - Steps and the six conceptual phases they belong to
//! - The ordered pipeline, its dependency validation and fingerprint
//! - Repository root resolution
//! - `refresh.toml` configuration
//! - The run state machine

pub mod config;
pub mod pipeline;
pub mod root;
pub mod state;
pub mod step;

pub use config::{ConfigError, RefreshConfig, CONFIG_FILE_NAME};
pub use pipeline::{default_pipeline, Pipeline, PipelineError, DEFAULT_INTERPRETER};
pub use root::resolve_root;
pub use state::{Run, RunState, StateError};
pub use step::{Phase, Step};
