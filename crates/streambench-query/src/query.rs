// SPDX-License-Identifier: MIT OR Apache-2.0
//! Temporal query plans.
//!
//! A [`Query`] is a tree of operators over input streams. Leaves are input
//! slots (the regions passed to the compiled routine in order); inner
//! sources are nested queries whose output is materialized before the
//! parent operator reads it.

use crate::error::CompileError;
use crate::expr::Expr;
use serde::{Deserialize, Serialize};
use std::fmt;
use streambench_core::{Dur, ScalarKind, Value};

/// Where an operator reads its elements from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    /// Input region at this position
    Input(usize),
    /// Output of a nested query
    Query(Box<Query>),
}

impl From<usize> for Source {
    fn from(slot: usize) -> Self {
        Self::Input(slot)
    }
}

impl From<Query> for Source {
    fn from(query: Query) -> Self {
        Self::Query(Box::new(query))
    }
}

impl Source {
    fn arity(&self) -> usize {
        match self {
            Self::Input(slot) => slot + 1,
            Self::Query(q) => q.arity(),
        }
    }

    fn output_kind(&self, inputs: &[ScalarKind]) -> Option<ScalarKind> {
        match self {
            Self::Input(slot) => inputs.get(*slot).copied(),
            Self::Query(q) => q.output_kind(inputs),
        }
    }
}

/// Aggregation applied to the elements of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Sum of values; empty windows emit 0
    Sum,
    /// Number of elements; empty windows emit 0
    Count,
    /// Arithmetic mean
    Average,
    /// Population variance
    Variance,
    /// Element count of the one-pass `(sum of squares, sum, count)` state
    StdDevState,
}

impl Reducer {
    /// Whether empty windows still produce an output element
    #[must_use]
    pub const fn emits_empty(self) -> bool {
        matches!(self, Self::Sum | Self::Count)
    }

    /// Whether whole compressed blocks can be folded without element reads
    #[must_use]
    pub const fn block_foldable(self) -> bool {
        matches!(self, Self::Sum | Self::Count | Self::Average)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Average => "avg",
            Self::Variance => "var",
            Self::StdDevState => "stddev_state",
        }
    }
}

/// Operator tree over input streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Point-wise map: one output per source element, same interval
    Select {
        /// Elements to map
        source: Source,
        /// Expression over `$0`
        expr: Expr,
        /// Output element kind
        output: ScalarKind,
    },
    /// Filter: keeps source elements whose predicate holds
    Where {
        /// Elements to filter
        source: Source,
        /// Predicate over `$0`
        predicate: Expr,
    },
    /// Windowed aggregation emitted every `period`
    WindowReduce {
        /// Elements to aggregate
        source: Source,
        /// Window length
        window: Dur,
        /// Distance between consecutive outputs
        period: Dur,
        /// Aggregation
        reducer: Reducer,
        /// Output element kind
        output: ScalarKind,
    },
    /// Temporal join: one output per overlapping interval pair.
    ///
    /// With `fill` set the join is outer: spans covered by only one side
    /// also produce an output, with `fill` standing in for the absent side.
    Join {
        /// Left stream, bound to `$0`
        left: Source,
        /// Right stream, bound to `$1`
        right: Source,
        /// Expression over `$0` and `$1`
        expr: Expr,
        /// Value of a missing side, `None` for an inner join
        #[serde(default)]
        fill: Option<Value>,
        /// Output element kind
        output: ScalarKind,
    },
}

impl Query {
    /// Map every element of `source` through `expr`
    #[must_use]
    pub fn select(source: impl Into<Source>, expr: Expr, output: ScalarKind) -> Self {
        Self::Select {
            source: source.into(),
            expr,
            output,
        }
    }

    /// Keep the elements of `source` that satisfy `predicate`
    #[must_use]
    pub fn filter(source: impl Into<Source>, predicate: Expr) -> Self {
        Self::Where {
            source: source.into(),
            predicate,
        }
    }

    /// Sliding window of length `window` emitted every `period`
    #[must_use]
    pub fn window(
        source: impl Into<Source>,
        window: Dur,
        period: Dur,
        reducer: Reducer,
        output: ScalarKind,
    ) -> Self {
        Self::WindowReduce {
            source: source.into(),
            window,
            period,
            reducer,
            output,
        }
    }

    /// Tumbling window: emitted once per `window`
    #[must_use]
    pub fn tumbling(
        source: impl Into<Source>,
        window: Dur,
        reducer: Reducer,
        output: ScalarKind,
    ) -> Self {
        Self::window(source, window, window, reducer, output)
    }

    /// Inner join of `left` and `right` on overlapping intervals
    #[must_use]
    pub fn join(
        left: impl Into<Source>,
        right: impl Into<Source>,
        expr: Expr,
        output: ScalarKind,
    ) -> Self {
        Self::Join {
            left: left.into(),
            right: right.into(),
            expr,
            fill: None,
            output,
        }
    }

    /// Outer join of `left` and `right`; a missing side reads as `fill`
    #[must_use]
    pub fn outer_join(
        left: impl Into<Source>,
        right: impl Into<Source>,
        expr: Expr,
        fill: Value,
        output: ScalarKind,
    ) -> Self {
        Self::Join {
            left: left.into(),
            right: right.into(),
            expr,
            fill: Some(fill),
            output,
        }
    }

    /// Number of input regions the query reads
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Select { source, .. }
            | Self::Where { source, .. }
            | Self::WindowReduce { source, .. } => source.arity(),
            Self::Join { left, right, .. } => left.arity().max(right.arity()),
        }
    }

    /// Output element kind given the input kinds, `None` if an input is missing
    #[must_use]
    pub fn output_kind(&self, inputs: &[ScalarKind]) -> Option<ScalarKind> {
        match self {
            Self::Select { output, .. }
            | Self::WindowReduce { output, .. }
            | Self::Join { output, .. } => Some(*output),
            Self::Where { source, .. } => source.output_kind(inputs),
        }
    }

    /// Check the query can be lowered.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidQuery`] for non-positive window or
    /// period lengths and for expressions reading unbound slots.
    pub fn validate(&self) -> Result<(), CompileError> {
        match self {
            Self::Select { source, expr, .. } => {
                check_slots(expr, 1)?;
                validate_source(source)
            }
            Self::Where { source, predicate } => {
                check_slots(predicate, 1)?;
                validate_source(source)
            }
            Self::WindowReduce {
                source,
                window,
                period,
                ..
            } => {
                if *window <= 0 || *period <= 0 {
                    return Err(CompileError::InvalidQuery(format!(
                        "window {window} and period {period} must be positive"
                    )));
                }
                validate_source(source)
            }
            Self::Join {
                left, right, expr, ..
            } => {
                check_slots(expr, 2)?;
                validate_source(left)?;
                validate_source(right)
            }
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = depth * 2;
        match self {
            Self::Select {
                source,
                expr,
                output,
            } => {
                writeln!(f, "{:pad$}select -> {output}: {expr}", "")?;
                source.fmt_tree(f, depth + 1)
            }
            Self::Where { source, predicate } => {
                writeln!(f, "{:pad$}where: {predicate}", "")?;
                source.fmt_tree(f, depth + 1)
            }
            Self::WindowReduce {
                source,
                window,
                period,
                reducer,
                output,
            } => {
                writeln!(
                    f,
                    "{:pad$}window[{window}, every {period}] -> {output}: {}",
                    "",
                    reducer.name()
                )?;
                source.fmt_tree(f, depth + 1)
            }
            Self::Join {
                left,
                right,
                expr,
                fill,
                output,
            } => {
                match fill {
                    Some(v) => {
                        let fill = Expr::Const(*v);
                        writeln!(f, "{:pad$}outer join({fill}) -> {output}: {expr}", "")?;
                    }
                    None => writeln!(f, "{:pad$}join -> {output}: {expr}", "")?,
                }
                left.fmt_tree(f, depth + 1)?;
                right.fmt_tree(f, depth + 1)
            }
        }
    }
}

impl Source {
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Self::Input(slot) => writeln!(f, "{:pad$}input {slot}", "", pad = depth * 2),
            Self::Query(q) => q.fmt_tree(f, depth),
        }
    }
}

fn check_slots(expr: &Expr, bound: usize) -> Result<(), CompileError> {
    match expr.max_slot() {
        Some(slot) if slot >= bound => Err(CompileError::InvalidQuery(format!(
            "expression {expr} reads ${slot}, operator binds {bound} input(s)"
        ))),
        _ => Ok(()),
    }
}

fn validate_source(source: &Source) -> Result<(), CompileError> {
    match source {
        Source::Input(_) => Ok(()),
        Source::Query(q) => q.validate(),
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
