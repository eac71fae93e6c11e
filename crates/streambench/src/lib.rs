// SPDX-License-Identifier: MIT OR Apache-2.0
//! # streambench
//!
//! Throughput harness for compiled queries over time-ordered streams stored
//! in two layouts: one slot per element, or base-delta compressed blocks.
//!
//! A run generates seeded synthetic input regions, compiles the scenario
//! query once through a [`QueryCompiler`], times the execution of the
//! compiled routine and releases every region.
//!
//! ## Crates
//!
//! - [`core`] - timestamps, scalar kinds and typed buffers
//! - [`region`] - uncompressed and compressed regions
//! - [`datagen`] - synthetic stream generators
//! - [`query`] - query algebra and compilers
//! - [`harness`] - lifecycle, parallel runner and scenarios
//!
//! ## Example
//!
//! ```
//! use streambench::{BenchConfig, LoopCompiler, ParallelBenchmarkRunner, ScenarioKind};
//!
//! let config = BenchConfig {
//!     size: 2048,
//!     threads: 2,
//!     ..BenchConfig::for_scenario(ScenarioKind::BdOptSelect)
//! };
//! let report = ParallelBenchmarkRunner::from_config(&config)
//!     .unwrap()
//!     .run(&LoopCompiler)
//!     .unwrap();
//! assert_eq!(report.total_elements(), 4096);
//! println!("{report}");
//! ```

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

/// Timestamps, scalar kinds and typed buffers
pub use streambench_core as core;
/// Synthetic stream generators
pub use streambench_datagen as datagen;
/// Lifecycle, parallel runner and scenarios
pub use streambench_harness as harness;
/// Query algebra and compilers
pub use streambench_query as query;
/// Uncompressed and compressed regions
pub use streambench_region as region;

pub use streambench_core::{ScalarKind, TimestampEntry, Ts, Value};
pub use streambench_datagen::{BlockCorrelatedStream, Dataset, UniformStream};
pub use streambench_harness::{
    BenchConfig, Benchmark, BenchmarkLifecycle, HarnessError, LifecycleState,
    ParallelBenchmarkRunner, RunReport, ScenarioBench, ScenarioKind,
};
pub use streambench_query::{
    CompiledRoutine, CompilerService, Expr, LoopCompiler, Query, QueryCompiler, Reducer,
};
pub use streambench_region::{CompressedRegion, CompressionPolicy, RegionRef, UncompressedRegion};
