// SPDX-License-Identifier: MIT OR Apache-2.0
//! streambench CLI binary - throughput of compiled stream queries

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use streambench_harness::{
    Benchmark, BenchConfig, BenchmarkLifecycle, ParallelBenchmarkRunner, RunReport, ScenarioBench,
    ScenarioKind,
};
use streambench_query::{CompilerService, LoopCompiler};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "streambench")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    /// Scenario to run (see --list) [default: select]
    #[arg(value_name = "SCENARIO")]
    scenario: Option<String>,

    /// Elements per instance [default: 100000000]
    #[arg(value_name = "SIZE")]
    size: Option<usize>,

    /// Parallel instances, one worker thread each [default: 1]
    #[arg(value_name = "THREADS")]
    threads: Option<usize>,

    /// Time between consecutive input elements
    #[arg(long)]
    period: Option<i64>,

    /// Window length (scenario default when unset)
    #[arg(long)]
    window: Option<i64>,

    /// Elements per compressed block
    #[arg(long = "block-size")]
    block_size: Option<usize>,

    /// Generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory receiving debug dumps
    #[arg(long = "dump-dir", value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    /// Dump every region before it is released
    #[arg(long = "debug-dump")]
    debug_dump: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// List the scenario catalogue and exit
    #[arg(long)]
    list: bool,

    /// Print the scenario's query plan and exit
    #[arg(long = "print-query")]
    print_query: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list {
        handle_list();
    } else if args.print_query {
        handle_print_query(&args);
    } else {
        handle_run(&args);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: {e}");
    }
}

fn handle_list() {
    for kind in ScenarioKind::ALL {
        let config = BenchConfig::for_scenario(kind);
        match ScenarioBench::new(&config, 0) {
            Ok(bench) => {
                let plan = bench.build_query().to_string();
                let root = plan.lines().next().unwrap_or_default();
                println!("{:<14} {root}", kind.name());
            }
            Err(e) => println!("{:<14} ({e})", kind.name()),
        }
    }
    for (alias, kind) in ScenarioKind::ALIASES {
        println!("{alias:<14} same as {kind}");
    }
}

fn handle_print_query(args: &Args) {
    if let Err(e) = run_print_query(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_print_query(args: &Args) -> Result<()> {
    let config = resolve_config(args)?;
    let bench = ScenarioBench::new(&config, 0)?;
    print!("{}", bench.build_query());
    Ok(())
}

fn handle_run(args: &Args) {
    if let Err(e) = run_bench(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_bench(args: &Args) -> Result<()> {
    let config = resolve_config(args)?;
    let compiler = CompilerService::new(LoopCompiler);
    let report = if config.threads == 1 {
        let mut lifecycle = BenchmarkLifecycle::new(ScenarioBench::new(&config, 0)?);
        if config.enable_debug_dump {
            lifecycle =
                lifecycle.with_debug_dump(&config.dump_dir, format!("{}_0", config.scenario));
        }
        lifecycle.run(&compiler)?
    } else {
        ParallelBenchmarkRunner::from_config(&config)?.run(&compiler)?
    };
    print_report(&report, args.json)
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Config file (or defaults) overridden by the positional arguments and flags
fn resolve_config(args: &Args) -> Result<BenchConfig> {
    let mut config = match &args.config {
        Some(path) => BenchConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BenchConfig::default(),
    };
    if let Some(name) = &args.scenario {
        config.scenario = name.parse()?;
    }
    if let Some(size) = args.size {
        config.size = size;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(period) = args.period {
        config.period = period;
    }
    if args.window.is_some() {
        config.window = args.window;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(dir) = &args.dump_dir {
        config.dump_dir.clone_from(dir);
    }
    if args.debug_dump {
        config.enable_debug_dump = true;
    }
    config.validate()?;
    Ok(config)
}
