// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parallel runner: N independent instances sharing one compiled routine.
//!
//! The routine is compiled on the first instance and attached to the
//! others before any worker starts. A dedicated pool of N threads then
//! initializes the instances concurrently, one task each, and after that
//! join runs the execute phase the same way. The reported time spans only
//! the concurrent execute phase up to its join.

use crate::bench::Benchmark;
use crate::config::BenchConfig;
use crate::error::{ConfigError, HarnessError, Result};
use crate::lifecycle::BenchmarkLifecycle;
use crate::report::RunReport;
use crate::scenario::ScenarioBench;
use parking_lot::Mutex;
use rayon::ThreadPool;
use std::time::Instant;
use streambench_query::QueryCompiler;
use tracing::{debug, info};

/// Runs several lifecycles of the same benchmark concurrently
#[derive(Debug)]
pub struct ParallelBenchmarkRunner<B> {
    instances: Vec<BenchmarkLifecycle<B>>,
}

impl ParallelBenchmarkRunner<ScenarioBench> {
    /// `config.threads` instances of the configured scenario, instance `i`
    /// seeded with `config.seed + i`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the config does not validate.
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        let instances = (0..config.threads)
            .map(|i| {
                let bench = ScenarioBench::new(config, i)?;
                let lifecycle = BenchmarkLifecycle::new(bench);
                Ok(if config.enable_debug_dump {
                    let tag = format!("{}_{i}", config.scenario);
                    lifecycle.with_debug_dump(&config.dump_dir, tag)
                } else {
                    lifecycle
                })
            })
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;
        Self::new(instances)
    }
}

impl<B: Benchmark> ParallelBenchmarkRunner<B> {
    /// Runner over prepared lifecycles
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `instances` is empty.
    pub fn new(instances: Vec<BenchmarkLifecycle<B>>) -> Result<Self> {
        if instances.is_empty() {
            return Err(ConfigError::Invalid(
                "parallel runner needs at least one instance".into(),
            )
            .into());
        }
        Ok(Self { instances })
    }

    /// Number of instances, one worker each
    #[must_use]
    pub fn threads(&self) -> usize {
        self.instances.len()
    }

    /// The managed lifecycles
    #[must_use]
    pub fn instances(&self) -> &[BenchmarkLifecycle<B>] {
        &self.instances
    }

    /// Compile once, init all concurrently, execute all concurrently,
    /// release all.
    ///
    /// # Errors
    ///
    /// Returns the compile error, or after the join of a concurrent phase
    /// the error of the lowest-numbered failing instance. Execution starts
    /// only when every instance initialized, and instances are only
    /// released when every worker succeeded.
    pub fn run(&mut self, compiler: &dyn QueryCompiler) -> Result<RunReport> {
        let threads = self.threads();
        let Some((first, rest)) = self.instances.split_first_mut() else {
            return Err(ConfigError::Invalid("no instances".into()).into());
        };
        let routine = first.compile(compiler)?;
        for instance in rest {
            instance.attach(routine.clone())?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("streambench-worker-{i}"))
            .build()?;
        on_workers(&pool, &mut self.instances, BenchmarkLifecycle::init)?;
        debug!(threads, symbol = routine.name(), "starting workers");

        let started = Instant::now();
        let executed = on_workers(&pool, &mut self.instances, |lc| lc.execute().map(drop));
        let elapsed = started.elapsed();
        executed?;

        for instance in &mut self.instances {
            instance.release()?;
        }
        let first = &self.instances[0];
        let report = RunReport::new(
            first.bench().name(),
            first.bench().elements(),
            threads,
            elapsed,
        );
        info!(
            scenario = %report.scenario,
            threads,
            elapsed_us = report.elapsed_us,
            throughput = report.throughput(),
            "parallel run complete"
        );
        Ok(report)
    }
}

/// Run `op` on every instance, one pool task each, and return the error of
/// the lowest-numbered failing instance once all tasks joined
fn on_workers<B, F>(pool: &ThreadPool, instances: &mut [BenchmarkLifecycle<B>], op: F) -> Result<()>
where
    B: Benchmark,
    F: Fn(&mut BenchmarkLifecycle<B>) -> Result<()> + Sync,
{
    let failures: Mutex<Vec<(usize, HarnessError)>> = Mutex::new(Vec::new());
    pool.scope(|scope| {
        for (i, instance) in instances.iter_mut().enumerate() {
            let (failures, op) = (&failures, &op);
            scope.spawn(move |_| {
                if let Err(e) = op(instance) {
                    failures.lock().push((i, e));
                }
            });
        }
    });
    let mut failures = failures.into_inner();
    failures.sort_by_key(|(i, _)| *i);
    match failures.into_iter().next() {
        Some((i, e)) => {
            debug!(instance = i, "worker failed");
            Err(e)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleState;
    use crate::scenario::ScenarioKind;
    use std::sync::Arc;
    use streambench_core::ScalarKind;
    use streambench_query::{CompiledRoutine, CompileError, ExecError, Expr, LoopCompiler, Query};

    fn config(kind: ScenarioKind, threads: usize) -> BenchConfig {
        BenchConfig {
            size: 1000,
            threads,
            ..BenchConfig::for_scenario(kind)
        }
    }

    #[test]
    fn test_runs_every_instance() {
        let mut runner =
            ParallelBenchmarkRunner::from_config(&config(ScenarioKind::Where, 4)).unwrap();
        let report = runner.run(&LoopCompiler).unwrap();
        assert_eq!(report.threads, 4);
        assert_eq!(report.total_elements(), 4000);
        assert!(
            runner
                .instances()
                .iter()
                .all(|lc| lc.state() == LifecycleState::Released)
        );
    }

    #[test]
    fn test_empty_runner_is_rejected() {
        let empty: Vec<BenchmarkLifecycle<ScenarioBench>> = Vec::new();
        assert!(matches!(
            ParallelBenchmarkRunner::new(empty),
            Err(HarnessError::Config(ConfigError::Invalid(_)))
        ));
    }

    struct Failing;

    impl QueryCompiler for Failing {
        fn compile(&self, query: &Query) -> std::result::Result<CompiledRoutine, CompileError> {
            Ok(CompiledRoutine::new("failing", query.arity(), |_, _, _, _| {
                Err(ExecError::DivisionByZero)
            }))
        }
    }

    #[test]
    fn test_worker_error_is_returned() {
        let mut runner =
            ParallelBenchmarkRunner::from_config(&config(ScenarioKind::Select, 2)).unwrap();
        let err = runner.run(&Failing).unwrap_err();
        assert!(matches!(err, HarnessError::Exec(ExecError::DivisionByZero)));
    }

    /// Records the thread that initialized it; instance `fail` errors
    struct Recorder {
        instance: usize,
        fail: Option<usize>,
        init_thread: Arc<Mutex<Vec<(usize, String)>>>,
    }

    impl Benchmark for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn elements(&self) -> usize {
            1
        }

        fn build_query(&self) -> Query {
            Query::select(0, Expr::input(0), ScalarKind::I64)
        }

        fn init(&mut self) -> Result<()> {
            let name = std::thread::current().name().unwrap_or_default().to_string();
            self.init_thread.lock().push((self.instance, name));
            if self.fail == Some(self.instance) {
                return Err(ConfigError::Invalid(format!("instance {}", self.instance)).into());
            }
            Ok(())
        }

        fn execute(&mut self, _routine: &CompiledRoutine) -> Result<()> {
            Ok(())
        }

        fn release(&mut self) -> usize {
            0
        }
    }

    fn recorders(
        n: usize,
        fail: Option<usize>,
    ) -> (ParallelBenchmarkRunner<Recorder>, Arc<Mutex<Vec<(usize, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let instances = (0..n)
            .map(|instance| {
                BenchmarkLifecycle::new(Recorder {
                    instance,
                    fail,
                    init_thread: Arc::clone(&seen),
                })
            })
            .collect();
        (ParallelBenchmarkRunner::new(instances).unwrap(), seen)
    }

    #[test]
    fn test_init_runs_on_pool_workers() {
        let (mut runner, seen) = recorders(3, None);
        runner.run(&LoopCompiler).unwrap();
        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen.len(), 3);
        for (i, (instance, thread)) in seen.iter().enumerate() {
            assert_eq!(*instance, i);
            assert!(thread.starts_with("streambench-worker-"), "{thread}");
        }
    }

    #[test]
    fn test_init_failure_stops_before_execute() {
        let (mut runner, seen) = recorders(4, Some(2));
        let err = runner.run(&LoopCompiler).unwrap_err();
        assert!(err.to_string().contains("instance 2"), "{err}");
        assert_eq!(seen.lock().len(), 4);
        let states: Vec<LifecycleState> = runner.instances().iter().map(|lc| lc.state()).collect();
        assert_eq!(states[2], LifecycleState::Compiled);
        assert!(states.iter().all(|s| *s != LifecycleState::Executed));
    }

    #[test]
    fn test_compile_happens_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(AtomicUsize);

        impl QueryCompiler for Counting {
            fn compile(&self, query: &Query) -> std::result::Result<CompiledRoutine, CompileError> {
                self.0.fetch_add(1, Ordering::Relaxed);
                LoopCompiler.compile(query)
            }
        }

        let compiler = Counting(AtomicUsize::new(0));
        let mut runner =
            ParallelBenchmarkRunner::from_config(&config(ScenarioKind::BdOptSum, 3)).unwrap();
        runner.run(&compiler).unwrap();
        assert_eq!(compiler.0.load(Ordering::Relaxed), 1);
    }
}
