// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmark lifecycle state machine.
//!
//! ```text
//! Uninitialized --compile/attach--> Compiled --init--> Initialized
//!     --execute--> Executed --release--> Released
//! ```
//!
//! Every other transition is rejected with
//! [`HarnessError::InvalidTransition`] and leaves the state unchanged.

use crate::bench::Benchmark;
use crate::error::{HarnessError, Result};
use crate::report::RunReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use streambench_query::{CompiledRoutine, QueryCompiler};
use streambench_region::dump::write_dump;
use tracing::{debug, info, warn};

/// Where a benchmark is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Nothing compiled or allocated
    Uninitialized,
    /// Routine available, no regions
    Compiled,
    /// Regions allocated and inputs generated
    Initialized,
    /// Routine ran once
    Executed,
    /// Regions freed
    Released,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Compiled => "compiled",
            Self::Initialized => "initialized",
            Self::Executed => "executed",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

/// Drives one [`Benchmark`] through compile, init, execute and release
#[derive(Debug)]
pub struct BenchmarkLifecycle<B> {
    bench: B,
    state: LifecycleState,
    routine: Option<CompiledRoutine>,
    dump_dir: Option<PathBuf>,
    tag: String,
}

impl<B: Benchmark> BenchmarkLifecycle<B> {
    /// Wrap `bench` in the `Uninitialized` state
    #[must_use]
    pub fn new(bench: B) -> Self {
        let tag = bench.name().to_string();
        Self {
            bench,
            state: LifecycleState::Uninitialized,
            routine: None,
            dump_dir: None,
            tag,
        }
    }

    /// Dump every region into `dir` on release; `tag` prefixes the files
    #[must_use]
    pub fn with_debug_dump(mut self, dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        self.dump_dir = Some(dir.into());
        self.tag = tag.into();
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// The driven benchmark
    #[must_use]
    pub const fn bench(&self) -> &B {
        &self.bench
    }

    /// Routine compiled or attached, if any
    #[must_use]
    pub const fn routine(&self) -> Option<&CompiledRoutine> {
        self.routine.as_ref()
    }

    const fn invalid(&self, op: &'static str) -> HarnessError {
        HarnessError::InvalidTransition {
            op,
            state: self.state,
        }
    }

    fn require(&self, op: &'static str, state: LifecycleState) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.invalid(op))
        }
    }

    /// Build the benchmark query and compile it with `compiler`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidTransition`] unless `Uninitialized`, and any
    /// compile error from the collaborator.
    pub fn compile(&mut self, compiler: &dyn QueryCompiler) -> Result<CompiledRoutine> {
        self.require("compile", LifecycleState::Uninitialized)?;
        let query = self.bench.build_query();
        debug!(bench = %self.tag, "compiling query:\n{query}");
        let routine = compiler.compile(&query)?;
        self.routine = Some(routine.clone());
        self.state = LifecycleState::Compiled;
        Ok(routine)
    }

    /// Use a routine compiled by another instance.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidTransition`] unless `Uninitialized`.
    pub fn attach(&mut self, routine: CompiledRoutine) -> Result<()> {
        self.require("attach", LifecycleState::Uninitialized)?;
        self.routine = Some(routine);
        self.state = LifecycleState::Compiled;
        Ok(())
    }

    /// Allocate the regions and generate the inputs.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidTransition`] unless `Compiled`, and any
    /// allocation or generator error.
    pub fn init(&mut self) -> Result<()> {
        self.require("init", LifecycleState::Compiled)?;
        self.bench.init()?;
        self.state = LifecycleState::Initialized;
        debug!(bench = %self.tag, "initialized");
        Ok(())
    }

    /// Run the routine once, timing only the call.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidTransition`] unless `Initialized`, and any
    /// error the routine returns; the state stays `Initialized` then.
    pub fn execute(&mut self) -> Result<Duration> {
        self.require("execute", LifecycleState::Initialized)?;
        let Some(routine) = self.routine.as_ref() else {
            return Err(self.invalid("execute"));
        };
        let started = Instant::now();
        self.bench.execute(routine)?;
        let elapsed = started.elapsed();
        self.state = LifecycleState::Executed;
        Ok(elapsed)
    }

    /// Free every region, dumping them first when a dump directory is set.
    ///
    /// Returns the bytes released. Dump failures are logged and do not
    /// prevent the release.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidTransition`] unless `Executed`; a second
    /// release is rejected.
    pub fn release(&mut self) -> Result<usize> {
        self.require("release", LifecycleState::Executed)?;
        if let Some(dir) = &self.dump_dir {
            for (name, region) in self.bench.regions() {
                let path = dir.join(format!("{}_{name}.txt", self.tag));
                match write_dump(&path, region) {
                    Ok(()) => debug!(path = %path.display(), "region dumped"),
                    Err(e) => warn!(path = %path.display(), error = %e, "region dump failed"),
                }
            }
        }
        let freed = self.bench.release();
        self.routine = None;
        self.state = LifecycleState::Released;
        debug!(bench = %self.tag, freed, "released");
        Ok(freed)
    }

    /// Compile, init, timed execute and release in one call.
    ///
    /// # Errors
    ///
    /// The first error of any step.
    pub fn run(&mut self, compiler: &dyn QueryCompiler) -> Result<RunReport> {
        self.compile(compiler)?;
        self.init()?;
        let elapsed = self.execute()?;
        self.release()?;
        let report = RunReport::new(self.bench.name(), self.bench.elements(), 1, elapsed);
        info!(
            scenario = %report.scenario,
            elapsed_us = report.elapsed_us,
            throughput = report.throughput(),
            "run complete"
        );
        Ok(report)
    }
}
