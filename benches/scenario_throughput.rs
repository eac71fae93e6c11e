// SPDX-License-Identifier: MIT OR Apache-2.0
// Benchmarks: missing_docs - criterion_group! macro generates undocumentable code
#![allow(missing_docs)]
// Benchmarks: clippy lints relaxed for benchmark code (not production)
#![allow(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Scenario throughput under criterion
//!
//! Inputs are generated in the setup closure so only the compiled routine
//! is measured, matching what the CLI reports.

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use streambench::{
    BenchConfig, Benchmark, LoopCompiler, ParallelBenchmarkRunner, QueryCompiler, ScenarioBench,
    ScenarioKind,
};

const SIZE: usize = 1 << 16;

fn bench_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_execute");
    group.throughput(Throughput::Elements(SIZE as u64));
    group.sample_size(20);

    for kind in ScenarioKind::ALL {
        let config = BenchConfig {
            size: SIZE,
            ..BenchConfig::for_scenario(kind)
        };
        let template = ScenarioBench::new(&config, 0).unwrap();
        let routine = LoopCompiler.compile(&template.build_query()).unwrap();

        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter_batched(
                || {
                    let mut bench = ScenarioBench::new(&config, 0).unwrap();
                    bench.init().unwrap();
                    bench
                },
                |mut bench| {
                    bench.execute(&routine).unwrap();
                    black_box(bench)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_parallel_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_run");
    group.sample_size(10);

    for threads in [1usize, 2, 4] {
        let config = BenchConfig {
            size: SIZE,
            threads,
            ..BenchConfig::for_scenario(ScenarioKind::BdOptSum)
        };
        group.throughput(Throughput::Elements((SIZE * threads) as u64));
        group.bench_with_input(BenchmarkId::new("bdoptsum", threads), &config, |b, config| {
            b.iter(|| {
                let report = ParallelBenchmarkRunner::from_config(config)
                    .unwrap()
                    .run(&LoopCompiler)
                    .unwrap();
                black_box(report)
            });
        });
    }

    group.finish();
}

criterion_group!(scenario_benches, bench_scenarios, bench_parallel_scaling);
criterion_main!(scenario_benches);
