// SPDX-License-Identifier: MIT OR Apache-2.0
//! Harness error types

use crate::lifecycle::LifecycleState;
use streambench_datagen::DatagenError;
use streambench_query::{CompileError, ExecError};
use streambench_region::RegionError;
use thiserror::Error;

/// Errors raised while loading or validating a [`BenchConfig`](crate::BenchConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Scenario name not in the catalogue
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    /// A parameter is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for a config
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a benchmark lifecycle or runner
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An operation was invoked from a state that does not allow it
    #[error("cannot {op} a benchmark in state {state}")]
    InvalidTransition {
        /// Rejected operation
        op: &'static str,
        /// State the benchmark was in
        state: LifecycleState,
    },

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Region allocation or commit error
    #[error(transparent)]
    Region(#[from] RegionError),

    /// Generator error
    #[error(transparent)]
    Datagen(#[from] DatagenError),

    /// Query compile error
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Compiled routine error
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Worker pool could not be built
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
