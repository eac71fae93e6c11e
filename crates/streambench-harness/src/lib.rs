// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmark harness for streambench
//!
//! Drives benchmarks through their lifecycle and measures execution time:
//!
//! - [`bench`] - the [`Benchmark`] capability set
//! - [`lifecycle`] - single-instance state machine with timed execute
//! - [`parallel`] - N instances sharing one compiled routine
//! - [`scenario`] - the catalogue of named workloads
//! - [`config`] - run parameters, loadable from JSON
//! - [`report`] - run reports and the throughput line
//!
//! # Example
//!
//! ```
//! use streambench_harness::{BenchConfig, BenchmarkLifecycle, ScenarioBench, ScenarioKind};
//! use streambench_query::LoopCompiler;
//!
//! let config = BenchConfig {
//!     size: 4096,
//!     ..BenchConfig::for_scenario(ScenarioKind::BdOptSum)
//! };
//! let mut lifecycle = BenchmarkLifecycle::new(ScenarioBench::new(&config, 0).unwrap());
//! let report = lifecycle.run(&LoopCompiler).unwrap();
//! assert_eq!(report.total_elements(), 4096);
//! ```

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

/// Benchmark capability set
pub mod bench;
/// Run configuration
pub mod config;
/// Harness error types
pub mod error;
/// Lifecycle state machine
pub mod lifecycle;
/// Parallel multi-instance runner
pub mod parallel;
/// Run reports
pub mod report;
/// Scenario catalogue
pub mod scenario;

pub use bench::{Benchmark, InputRegion};
pub use config::BenchConfig;
pub use error::{ConfigError, HarnessError, Result};
pub use lifecycle::{BenchmarkLifecycle, LifecycleState};
pub use parallel::ParallelBenchmarkRunner;
pub use report::{RunReport, significant};
pub use scenario::{ScenarioBench, ScenarioKind};
