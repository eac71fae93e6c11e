// SPDX-License-Identifier: MIT OR Apache-2.0
//! # streambench-cli
//!
//! Command-line interface for streambench, a throughput harness for
//! compiled queries over time-ordered streams.
//!
//! ## Usage
//!
//! ```bash
//! # Default run: select over 100M i64 elements on one thread
//! streambench
//!
//! # Block-folded sum over 10M compressed elements on 4 threads
//! streambench bdoptsum 10000000 4
//!
//! # Sliding sum with a custom window and period
//! streambench naivesum 1000000 --period 2 --window 400
//!
//! # Settings from a JSON file, overridden by flags
//! streambench --config bench.json --seed 7
//!
//! # Show the catalogue and a scenario's query plan
//! streambench --list
//! streambench bdwhere --print-query
//! ```
//!
//! Every run prints one line on stdout:
//!
//! ```text
//! Throughput(M/s), <scenario>, <threads>, <million elements per second>
//! ```
//!
//! or the full run report as JSON with `--json`. Logs go to stderr.
//!
//! ## Library Usage
//!
//! This crate is primarily a CLI tool. For programmatic access use the
//! constituent library crates directly:
//!
//! - [`streambench-harness`](https://docs.rs/streambench-harness) - Lifecycle, runner and scenarios
//! - [`streambench-query`](https://docs.rs/streambench-query) - Query algebra and compilers

#![doc(html_root_url = "https://docs.rs/streambench-cli/0.1.0")]
#![warn(missing_docs)]

/// Re-export of streambench-harness for lifecycle and scenario types.
pub use streambench_harness as harness;

/// Re-export of streambench-query for the compiler seam.
pub use streambench_query as query;
