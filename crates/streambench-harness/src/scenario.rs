// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scenario catalogue.
//!
//! Every [`ScenarioKind`] fixes the input layouts, the generator feeding
//! them, the query and the output sizing. [`ScenarioBench`] implements the
//! [`Benchmark`] capability set for all of them.

use crate::bench::{Benchmark, InputRegion};
use crate::config::BenchConfig;
use crate::error::{ConfigError, HarnessError, Result};
use crate::lifecycle::LifecycleState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use streambench_core::{Dur, ScalarKind, Value};
use streambench_datagen::{BlockCorrelatedStream, Dataset, UniformStream};
use streambench_query::{CompiledRoutine, Expr, Query, Reducer};
use streambench_region::{CompressedRegion, CompressionPolicy, RegionRef, UncompressedRegion};
use tracing::debug;

/// Named benchmark workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// `$0 + 3` over `i64`
    #[serde(alias = "select64")]
    Select,
    /// `$0 + 3` over `i8`
    Select8,
    /// `$0 > 0` filter over `i64`
    #[serde(alias = "where64")]
    Where,
    /// `$0 > 0` filter over `i8`
    Where8,
    /// Tumbling sum over `i64`
    #[serde(alias = "sum64")]
    Aggregate,
    /// Tumbling sum over `i8`
    Sum8,
    /// Tumbling sum of positive `i64` values
    #[serde(alias = "sumwhere64")]
    SumWhere,
    /// Tumbling sum of positive `i8` values
    SumWhere8,
    /// Tumbling average over `f32` from separate sum and count passes
    Avg,
    /// Tumbling average over `f32` in a single reduction
    AvgOnePass,
    /// Single-reduction average over `i64`, truncated to `i64`
    AvgOnePass64,
    /// Single-reduction average over `i8`, truncated to `i8`
    AvgOnePass8,
    /// Tumbling variance over `i64`: window mean first, then the mean
    /// squared deviation from it
    Var64,
    /// Tumbling variance over `i64` in a single reduction
    Var64OnePass,
    /// Sliding sum, window twice the hop
    NaiveSum,
    /// Join of two compressed streams
    InnerJoin,
    /// Outer join of two `f32` streams, the right one half as long
    OuterJoin,
    /// Base stream joined with a fine-grained delta stream
    BdSelect,
    /// Filter over the base/delta join
    BdWhere,
    /// `$0 + 3` over a compressed stream
    BdOptSelect,
    /// `$0 > 0` filter over a compressed stream
    BdOptWhere,
    /// Block-folded tumbling sum over a compressed stream
    BdOptSum,
    /// Tumbling sum of positive values of a compressed stream
    BdOptSumWhere,
    /// Block-folded tumbling average over a compressed stream
    BdOptAvg,
    /// One-pass standard deviation state over a compressed stream
    BdOptStdDev,
}

impl ScenarioKind {
    /// Every scenario, in catalogue order
    pub const ALL: [Self; 25] = [
        Self::Select,
        Self::Select8,
        Self::Where,
        Self::Where8,
        Self::Aggregate,
        Self::Sum8,
        Self::SumWhere,
        Self::SumWhere8,
        Self::Avg,
        Self::AvgOnePass,
        Self::AvgOnePass64,
        Self::AvgOnePass8,
        Self::Var64,
        Self::Var64OnePass,
        Self::NaiveSum,
        Self::InnerJoin,
        Self::OuterJoin,
        Self::BdSelect,
        Self::BdWhere,
        Self::BdOptSelect,
        Self::BdOptWhere,
        Self::BdOptSum,
        Self::BdOptSumWhere,
        Self::BdOptAvg,
        Self::BdOptStdDev,
    ];

    /// Names accepted for scenarios whose base name already runs over `i64`
    pub const ALIASES: [(&'static str, Self); 4] = [
        ("select64", Self::Select),
        ("where64", Self::Where),
        ("sum64", Self::Aggregate),
        ("sumwhere64", Self::SumWhere),
    ];

    /// Command-line name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Select8 => "select8",
            Self::Where => "where",
            Self::Where8 => "where8",
            Self::Aggregate => "aggregate",
            Self::Sum8 => "sum8",
            Self::SumWhere => "sumwhere",
            Self::SumWhere8 => "sumwhere8",
            Self::Avg => "avg",
            Self::AvgOnePass => "avgonepass",
            Self::AvgOnePass64 => "avgonepass64",
            Self::AvgOnePass8 => "avgonepass8",
            Self::Var64 => "var64",
            Self::Var64OnePass => "var64onepass",
            Self::NaiveSum => "naivesum",
            Self::InnerJoin => "innerjoin",
            Self::OuterJoin => "outerjoin",
            Self::BdSelect => "bdselect",
            Self::BdWhere => "bdwhere",
            Self::BdOptSelect => "bdoptselect",
            Self::BdOptWhere => "bdoptwhere",
            Self::BdOptSum => "bdoptsum",
            Self::BdOptSumWhere => "bdoptsumwhere",
            Self::BdOptAvg => "bdoptavg",
            Self::BdOptStdDev => "bdoptstddev",
        }
    }

    /// Whether the inputs are base-delta compressed regions
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            Self::InnerJoin
                | Self::BdOptSelect
                | Self::BdOptWhere
                | Self::BdOptSum
                | Self::BdOptSumWhere
                | Self::BdOptAvg
                | Self::BdOptStdDev
        )
    }

    /// Whether the scenario joins a base stream with a delta stream
    #[must_use]
    pub const fn is_two_stream(self) -> bool {
        matches!(self, Self::BdSelect | Self::BdWhere)
    }

    /// Window used when the config leaves it unset
    #[must_use]
    pub const fn default_window(self, period: Dur) -> Dur {
        let factor = match self {
            Self::NaiveSum
            | Self::BdSelect
            | Self::BdWhere
            | Self::BdOptAvg
            | Self::BdOptStdDev => 100,
            _ => 1000,
        };
        period.saturating_mul(factor)
    }

    /// Element kind of the uniform input of single-stream scenarios
    const fn uniform_kind(self) -> ScalarKind {
        match self {
            Self::Select8 | Self::Where8 | Self::Sum8 | Self::SumWhere8 | Self::AvgOnePass8 => {
                ScalarKind::I8
            }
            Self::Avg | Self::AvgOnePass | Self::OuterJoin => ScalarKind::F32,
            _ => ScalarKind::I64,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .or_else(|| {
                Self::ALIASES
                    .into_iter()
                    .find_map(|(alias, k)| (alias == s).then_some(k))
            })
            .ok_or_else(|| ConfigError::UnknownScenario(s.to_string()))
    }
}

fn positive() -> Expr {
    Expr::input(0).gt(Expr::int(0))
}

/// A scenario instance with its own regions
#[derive(Debug)]
pub struct ScenarioBench {
    kind: ScenarioKind,
    size: usize,
    period: Dur,
    window: Dur,
    block_size: usize,
    seed: u64,
    inputs: Vec<InputRegion>,
    output: Option<UncompressedRegion>,
}

impl ScenarioBench {
    /// Instance `instance` of the configured scenario; it draws from
    /// `seed + instance`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the config does not validate.
    pub fn new(config: &BenchConfig, instance: usize) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            kind: config.scenario,
            size: config.size,
            period: config.period,
            window: config.window(),
            block_size: config.block_size,
            seed: config.seed.wrapping_add(instance as u64),
            inputs: Vec::new(),
            output: None,
        })
    }

    /// Scenario of this instance
    #[must_use]
    pub const fn kind(&self) -> ScenarioKind {
        self.kind
    }

    /// Seed the generators draw from
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Input regions, empty before `init` and after `release`
    #[must_use]
    pub fn inputs(&self) -> &[InputRegion] {
        &self.inputs
    }

    /// Output region, `None` before `init` and after `release`
    #[must_use]
    pub const fn output(&self) -> Option<&UncompressedRegion> {
        self.output.as_ref()
    }

    /// End of the queried range `[0, end)`
    #[must_use]
    pub const fn end_time(&self) -> Dur {
        self.period * self.size as Dur
    }

    fn hop(&self) -> Dur {
        match self.kind {
            ScenarioKind::NaiveSum => (self.window / 2).max(1),
            _ => self.window,
        }
    }

    /// Elements in the coarse base stream of two-stream scenarios
    fn base_len(&self) -> usize {
        (self.end_time() / self.window) as usize + 1
    }

    fn output_layout(&self) -> (ScalarKind, usize) {
        let windows = (self.end_time() / self.hop()) as usize + 1;
        match self.kind {
            ScenarioKind::Select
            | ScenarioKind::Select8
            | ScenarioKind::Where
            | ScenarioKind::Where8 => (self.kind.uniform_kind(), self.size),
            ScenarioKind::BdOptSelect | ScenarioKind::BdOptWhere | ScenarioKind::InnerJoin => {
                (ScalarKind::I64, self.size)
            }
            ScenarioKind::OuterJoin => (ScalarKind::F32, self.size),
            ScenarioKind::BdSelect | ScenarioKind::BdWhere => {
                (ScalarKind::I64, self.size + self.base_len())
            }
            ScenarioKind::Avg
            | ScenarioKind::AvgOnePass
            | ScenarioKind::BdOptAvg
            | ScenarioKind::BdOptStdDev => (ScalarKind::F32, windows),
            ScenarioKind::AvgOnePass64 | ScenarioKind::AvgOnePass8 => {
                (self.kind.uniform_kind(), windows)
            }
            ScenarioKind::Var64 | ScenarioKind::Var64OnePass => (ScalarKind::F64, windows),
            ScenarioKind::Aggregate
            | ScenarioKind::Sum8
            | ScenarioKind::SumWhere
            | ScenarioKind::SumWhere8
            | ScenarioKind::NaiveSum
            | ScenarioKind::BdOptSum
            | ScenarioKind::BdOptSumWhere => (ScalarKind::I64, windows),
        }
    }

    fn uniform(&self, kind: ScalarKind, period: Dur, len: usize, seed: u64) -> Result<InputRegion> {
        let mut region = UncompressedRegion::allocate(kind, len);
        UniformStream::new(period, len, seed)?.fill(&mut region)?;
        debug!(scenario = %self.kind, %kind, len, "uniform input ready");
        Ok(InputRegion::Uncompressed(region))
    }

    fn block_correlated(&self, seed: u64) -> Result<InputRegion> {
        let mut region = CompressedRegion::allocate(
            ScalarKind::I64,
            ScalarKind::I8,
            self.size,
            self.block_size,
            CompressionPolicy::Always,
        )?;
        BlockCorrelatedStream::new(self.period, self.size, seed)?.fill(&mut region)?;
        debug!(
            scenario = %self.kind,
            blocks = region.num_blocks(),
            payload = region.payload_len(),
            "compressed input ready"
        );
        Ok(InputRegion::Compressed(region))
    }
}

impl Benchmark for ScenarioBench {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn elements(&self) -> usize {
        self.size
    }

    fn build_query(&self) -> Query {
        let w = self.window;
        match self.kind {
            ScenarioKind::Select | ScenarioKind::Select8 => Query::select(
                0,
                Expr::input(0) + Expr::int(3),
                self.kind.uniform_kind(),
            ),
            ScenarioKind::BdOptSelect => {
                Query::select(0, Expr::input(0) + Expr::int(3), ScalarKind::I64)
            }
            ScenarioKind::Where | ScenarioKind::Where8 | ScenarioKind::BdOptWhere => {
                Query::filter(0, positive())
            }
            ScenarioKind::Aggregate | ScenarioKind::Sum8 | ScenarioKind::BdOptSum => {
                Query::tumbling(0, w, Reducer::Sum, ScalarKind::I64)
            }
            ScenarioKind::SumWhere | ScenarioKind::SumWhere8 | ScenarioKind::BdOptSumWhere => {
                Query::tumbling(Query::filter(0, positive()), w, Reducer::Sum, ScalarKind::I64)
            }
            ScenarioKind::Avg => Query::join(
                Query::tumbling(0, w, Reducer::Sum, ScalarKind::F32),
                Query::tumbling(0, w, Reducer::Count, ScalarKind::I64),
                Expr::input(0) / Expr::input(1).cast(ScalarKind::F32),
                ScalarKind::F32,
            ),
            ScenarioKind::AvgOnePass | ScenarioKind::BdOptAvg => {
                Query::tumbling(0, w, Reducer::Average, ScalarKind::F32)
            }
            ScenarioKind::AvgOnePass64 | ScenarioKind::AvgOnePass8 => {
                Query::tumbling(0, w, Reducer::Average, self.kind.uniform_kind())
            }
            ScenarioKind::Var64 => {
                let deviation = Expr::input(0) - Expr::input(1);
                let squared = Query::join(
                    0,
                    Query::tumbling(0, w, Reducer::Average, ScalarKind::F64),
                    deviation.clone() * deviation,
                    ScalarKind::F64,
                );
                Query::tumbling(squared, w, Reducer::Average, ScalarKind::F64)
            }
            ScenarioKind::Var64OnePass => {
                Query::tumbling(0, w, Reducer::Variance, ScalarKind::F64)
            }
            ScenarioKind::BdOptStdDev => {
                Query::tumbling(0, w, Reducer::StdDevState, ScalarKind::F32)
            }
            ScenarioKind::NaiveSum => {
                Query::window(0, w, self.hop(), Reducer::Sum, ScalarKind::I64)
            }
            ScenarioKind::InnerJoin => {
                Query::join(0, 1, Expr::input(0) + Expr::input(1), ScalarKind::I64)
            }
            ScenarioKind::OuterJoin => Query::outer_join(
                0,
                1,
                Expr::input(0) + Expr::input(1),
                Value::Float(0.0),
                ScalarKind::F32,
            ),
            ScenarioKind::BdSelect => Query::join(
                0,
                1,
                Expr::input(0) + Expr::input(1).cast(ScalarKind::I64) + Expr::int(3),
                ScalarKind::I64,
            ),
            ScenarioKind::BdWhere => Query::filter(
                Query::join(
                    0,
                    1,
                    Expr::input(0) + Expr::input(1).cast(ScalarKind::I64),
                    ScalarKind::I64,
                ),
                positive(),
            ),
        }
    }

    fn init(&mut self) -> Result<()> {
        let seed = self.seed;
        self.inputs = match self.kind {
            ScenarioKind::InnerJoin => vec![
                self.block_correlated(seed)?,
                self.block_correlated(seed.rotate_left(32))?,
            ],
            kind if kind.is_compressed() => vec![self.block_correlated(seed)?],
            ScenarioKind::BdSelect | ScenarioKind::BdWhere => vec![
                self.uniform(ScalarKind::I64, self.window, self.base_len(), seed)?,
                self.uniform(ScalarKind::I8, self.period, self.size, seed.rotate_left(32))?,
            ],
            ScenarioKind::OuterJoin => {
                let right = (self.size / 2).max(1);
                vec![
                    self.uniform(ScalarKind::F32, self.period, self.size, seed)?,
                    self.uniform(ScalarKind::F32, self.period, right, seed.rotate_left(32))?,
                ]
            }
            kind => vec![self.uniform(kind.uniform_kind(), self.period, self.size, seed)?],
        };
        let (kind, capacity) = self.output_layout();
        self.output = Some(UncompressedRegion::allocate(kind, capacity));
        Ok(())
    }

    fn execute(&mut self, routine: &CompiledRoutine) -> Result<()> {
        let end = self.end_time();
        let Some(output) = self.output.as_mut() else {
            return Err(HarnessError::InvalidTransition {
                op: "execute",
                state: LifecycleState::Uninitialized,
            });
        };
        let inputs: Vec<RegionRef<'_>> = self.inputs.iter().map(InputRegion::view).collect();
        routine.call(0, end, output, &inputs)?;
        Ok(())
    }

    fn release(&mut self) -> usize {
        let inputs: usize = self.inputs.drain(..).map(InputRegion::release).sum();
        inputs + self.output.take().map_or(0, UncompressedRegion::release)
    }

    fn regions(&self) -> Vec<(String, RegionRef<'_>)> {
        let mut named: Vec<(String, RegionRef<'_>)> = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("input{i}"), r.view()))
            .collect();
        if let Some(out) = &self.output {
            named.push(("output".to_string(), RegionRef::from(out)));
        }
        named
    }
}
