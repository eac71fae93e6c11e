// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference loop compiler.
//!
//! [`LoopCompiler`] lowers a [`Query`] into a routine that walks the input
//! regions with explicit loops. Time semantics shared by every operator:
//!
//! - an element takes part iff its interval start lies in `[start, end)`;
//! - point-wise outputs keep the interval of the element (or of the join
//!   overlap) they were produced from;
//! - outer joins split both streams at every interval boundary and emit one
//!   output per span covered by at least one side;
//! - windowed outputs are committed at ticks `start + k * period <= end`
//!   and aggregate the elements whose interval ends in `(tick - window, tick]`.

use crate::compiler::{CompiledRoutine, QueryCompiler, symbol_name};
use crate::error::{CompileError, ExecError};
use crate::expr::Expr;
use crate::query::{Query, Reducer, Source};
use std::sync::Arc;
use streambench_core::{Dur, ScalarKind, Ts, Value};
use streambench_region::{RegionRef, UncompressedRegion};
use tracing::debug;

/// Compiler producing interpreted loop routines
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopCompiler;

impl QueryCompiler for LoopCompiler {
    fn compile(&self, query: &Query) -> Result<CompiledRoutine, CompileError> {
        query.validate()?;
        let arity = query.arity();
        let name = symbol_name(query);
        debug!(symbol = %name, arity, "building loop routine");
        let plan = Arc::new(query.clone());
        Ok(CompiledRoutine::new(
            name,
            arity,
            move |start, end, output, inputs| run(&plan, start, end, output, inputs),
        ))
    }
}

/// Evaluate `query` over `[start, end)` into `output`.
///
/// # Errors
///
/// Returns [`ExecError`] when an expression fails or `output` rejects a
/// commit (full or out of order).
///
/// # Panics
///
/// Panics when `inputs` holds fewer regions than [`Query::arity`].
pub fn run(
    query: &Query,
    start: Ts,
    end: Ts,
    output: &mut UncompressedRegion,
    inputs: &[RegionRef<'_>],
) -> Result<(), ExecError> {
    match query {
        Query::Select { source, expr, .. } => {
            let src = resolve(source, start, end, inputs)?;
            select(src.view(), expr, start, end, output)
        }
        Query::Where { source, predicate } => {
            let src = resolve(source, start, end, inputs)?;
            filter(src.view(), predicate, start, end, output)
        }
        Query::WindowReduce {
            source,
            window,
            period,
            reducer,
            ..
        } => {
            let src = resolve(source, start, end, inputs)?;
            let spec = WindowSpec {
                window: *window,
                period: *period,
                reducer: *reducer,
            };
            window_reduce(src.view(), spec, start, end, output)
        }
        Query::Join {
            left,
            right,
            expr,
            fill,
            ..
        } => {
            let l = resolve(left, start, end, inputs)?;
            let r = resolve(right, start, end, inputs)?;
            match fill {
                Some(fill) => outer_join(l.view(), r.view(), expr, *fill, start, end, output),
                None => join(l.view(), r.view(), expr, start, end, output),
            }
        }
    }
}

enum Resolved<'a> {
    Borrowed(RegionRef<'a>),
    Owned(UncompressedRegion),
}

impl Resolved<'_> {
    fn view(&self) -> RegionRef<'_> {
        match self {
            Self::Borrowed(r) => *r,
            Self::Owned(r) => RegionRef::Uncompressed(r),
        }
    }
}

fn resolve<'a>(
    source: &Source,
    start: Ts,
    end: Ts,
    inputs: &[RegionRef<'a>],
) -> Result<Resolved<'a>, ExecError> {
    match source {
        Source::Input(slot) => Ok(Resolved::Borrowed(inputs[*slot])),
        Source::Query(q) => {
            let kinds: Vec<ScalarKind> = inputs.iter().map(RegionRef::kind).collect();
            let kind = q.output_kind(&kinds).ok_or(ExecError::MissingInput {
                expected: q.arity(),
                found: inputs.len(),
            })?;
            let cap = bound(q, start, end, inputs);
            let mut tmp = UncompressedRegion::allocate_at(kind, cap, start);
            run(q, start, end, &mut tmp, inputs)?;
            Ok(Resolved::Owned(tmp))
        }
    }
}

fn bound(query: &Query, start: Ts, end: Ts, inputs: &[RegionRef<'_>]) -> usize {
    let source_bound = |s: &Source| match s {
        Source::Input(slot) => inputs[*slot].len(),
        Source::Query(q) => bound(q, start, end, inputs),
    };
    match query {
        Query::Select { source, .. } | Query::Where { source, .. } => source_bound(source),
        Query::WindowReduce { period, .. } => ((end - start).max(0) / period) as usize + 1,
        Query::Join {
            left,
            right,
            fill: None,
            ..
        } => source_bound(left) + source_bound(right),
        Query::Join { left, right, .. } => 2 * (source_bound(left) + source_bound(right)),
    }
}

fn partition_point(len: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Indices of the elements whose interval starts in `[start, end)`
fn in_range(view: RegionRef<'_>, start: Ts, end: Ts) -> (usize, usize) {
    let len = view.len();
    let lo = partition_point(len, |i| view.entry(i).t < start);
    let hi = partition_point(len, |i| view.entry(i).t < end);
    (lo, hi)
}

fn select(
    view: RegionRef<'_>,
    expr: &Expr,
    start: Ts,
    end: Ts,
    output: &mut UncompressedRegion,
) -> Result<(), ExecError> {
    let (lo, hi) = in_range(view, start, end);
    for i in lo..hi {
        let e = view.entry(i);
        let v = expr.eval(&[view.value(i)])?;
        let idx = output.commit_with_period(e.end(), e.d)?;
        output.put_value(idx, v);
    }
    Ok(())
}

fn filter(
    view: RegionRef<'_>,
    predicate: &Expr,
    start: Ts,
    end: Ts,
    output: &mut UncompressedRegion,
) -> Result<(), ExecError> {
    let (lo, hi) = in_range(view, start, end);
    for i in lo..hi {
        let e = view.entry(i);
        let v = view.value(i);
        if predicate.eval(&[v])?.as_bool() {
            let idx = output.commit_with_period(e.end(), e.d)?;
            output.put_value(idx, v);
        } else {
            output.commit_null(e.end())?;
        }
    }
    Ok(())
}

fn join(
    left: RegionRef<'_>,
    right: RegionRef<'_>,
    expr: &Expr,
    start: Ts,
    end: Ts,
    output: &mut UncompressedRegion,
) -> Result<(), ExecError> {
    let (mut i, li) = in_range(left, start, end);
    let (mut j, rj) = in_range(right, start, end);
    while i < li && j < rj {
        let a = left.entry(i);
        let b = right.entry(j);
        let lo = a.t.max(b.t);
        let hi = a.end().min(b.end());
        if lo < hi {
            let v = expr.eval(&[left.value(i), right.value(j)])?;
            let idx = output.commit_with_period(hi, hi - lo)?;
            output.put_value(idx, v);
        }
        if a.end() <= b.end() {
            i += 1;
        } else {
            j += 1;
        }
    }
    Ok(())
}

/// Value of the element before index `to` whose interval covers `t`.
///
/// `cursor` moves past every element ending at or before `t`.
fn covering(view: RegionRef<'_>, cursor: &mut usize, to: usize, t: Ts) -> Option<Value> {
    while *cursor < to && view.entry(*cursor).end() <= t {
        *cursor += 1;
    }
    (*cursor < to && view.entry(*cursor).t <= t).then(|| view.value(*cursor))
}

fn outer_join(
    left: RegionRef<'_>,
    right: RegionRef<'_>,
    expr: &Expr,
    fill: Value,
    start: Ts,
    end: Ts,
    output: &mut UncompressedRegion,
) -> Result<(), ExecError> {
    let (mut i, li) = in_range(left, start, end);
    let (mut j, rj) = in_range(right, start, end);
    let mut cuts = Vec::with_capacity(2 * (li - i + rj - j));
    for (view, lo, hi) in [(left, i, li), (right, j, rj)] {
        for k in lo..hi {
            let e = view.entry(k);
            cuts.extend([e.t, e.end()]);
        }
    }
    cuts.sort_unstable();
    cuts.dedup();
    for span in cuts.windows(2) {
        let (lo, hi) = (span[0], span[1]);
        let a = covering(left, &mut i, li, lo);
        let b = covering(right, &mut j, rj, lo);
        if a.is_none() && b.is_none() {
            continue;
        }
        let v = expr.eval(&[a.unwrap_or(fill), b.unwrap_or(fill)])?;
        let idx = output.commit_with_period(hi, hi - lo)?;
        output.put_value(idx, v);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct WindowSpec {
    window: Dur,
    period: Dur,
    reducer: Reducer,
}

#[derive(Debug, Default)]
struct Acc {
    count: i64,
    int_sum: i64,
    float_sum: f64,
    sq_sum: f64,
    float: bool,
}

impl Acc {
    fn push(&mut self, v: Value) {
        let f = v.as_f64();
        self.count += 1;
        self.float |= v.is_float();
        self.int_sum = self.int_sum.wrapping_add(v.as_i64());
        self.float_sum += f;
        self.sq_sum += f * f;
    }

    fn push_block(&mut self, sum: i64, n: usize) {
        self.count += n as i64;
        self.int_sum = self.int_sum.wrapping_add(sum);
        self.float_sum += sum as f64;
    }

    fn finish(&self, reducer: Reducer) -> Option<Value> {
        if self.count == 0 && !reducer.emits_empty() {
            return None;
        }
        let n = self.count as f64;
        Some(match reducer {
            Reducer::Sum if self.float => Value::Float(self.float_sum),
            Reducer::Sum => Value::Int(self.int_sum),
            Reducer::Count | Reducer::StdDevState => Value::Int(self.count),
            Reducer::Average => Value::Float(self.float_sum / n),
            Reducer::Variance => {
                let mean = self.float_sum / n;
                Value::Float((self.sq_sum / n - mean * mean).max(0.0))
            }
        })
    }
}

fn fold(view: RegionRef<'_>, lo: usize, hi: usize, reducer: Reducer) -> Acc {
    let mut acc = Acc::default();
    match view.as_compressed() {
        Some(reg) if reducer.block_foldable() => {
            let mut i = lo;
            while i < hi {
                let k = reg.block_of(i);
                let first = k * reg.block_size();
                let n = reg.block_elems(k);
                if i == first && first + n <= hi {
                    acc.push_block(reg.block_sum(k), n);
                    i += n;
                } else {
                    acc.push(view.value(i));
                    i += 1;
                }
            }
        }
        _ => (lo..hi).for_each(|i| acc.push(view.value(i))),
    }
    acc
}

fn window_reduce(
    view: RegionRef<'_>,
    spec: WindowSpec,
    start: Ts,
    end: Ts,
    output: &mut UncompressedRegion,
) -> Result<(), ExecError> {
    let (first, last) = in_range(view, start, end);
    let (mut lo, mut hi) = (first, first);
    let mut tick = start + spec.period;
    while tick <= end {
        while hi < last && view.entry(hi).end() <= tick {
            hi += 1;
        }
        while lo < hi && view.entry(lo).end() <= tick - spec.window {
            lo += 1;
        }
        match fold(view, lo, hi, spec.reducer).finish(spec.reducer) {
            Some(v) => {
                let idx = output.commit(tick)?;
                output.put_value(idx, v);
            }
            None => output.commit_null(tick)?,
        }
        tick += spec.period;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use streambench_core::{DeltaTimestamp, TimestampEntry};
    use streambench_region::{CompressedRegion, CompressionPolicy};

    fn stream(kind: ScalarKind, period: i64, values: &[i64]) -> UncompressedRegion {
        let mut reg = UncompressedRegion::allocate(kind, values.len());
        for (i, v) in values.iter().enumerate() {
            let idx = reg.commit(period * (i as i64 + 1)).unwrap();
            reg.put_value(idx, Value::Int(*v));
        }
        reg
    }

    fn compressed(values: &[i64], block_size: usize) -> CompressedRegion {
        let mut reg = CompressedRegion::allocate(
            ScalarKind::I64,
            ScalarKind::I8,
            values.len(),
            block_size,
            CompressionPolicy::Always,
        )
        .unwrap();
        for k in 0..reg.num_blocks() {
            let first = k * block_size;
            reg.commit_block(k, TimestampEntry::new(first as i64, 1), true)
                .unwrap();
            reg.write_base(k, -10);
            for j in 0..reg.block_elems(k) {
                reg.commit_element(first + j, DeltaTimestamp::new(j as u32, 1))
                    .unwrap();
                reg.write_delta(first + j, values[first + j] + 10);
            }
        }
        reg
    }

    fn values(reg: &UncompressedRegion) -> Vec<i64> {
        reg.iter().map(|(_, v)| v.as_i64()).collect()
    }

    fn exec(query: &Query, end: Ts, cap: usize, inputs: &[RegionRef<'_>]) -> UncompressedRegion {
        let routine = LoopCompiler.compile(query).unwrap();
        let mut out = UncompressedRegion::allocate(ScalarKind::I64, cap);
        routine.call(0, end, &mut out, inputs).unwrap();
        out
    }

    #[test]
    fn test_select_keeps_intervals() {
        let input = stream(ScalarKind::I64, 2, &[1, -4, 9]);
        let q = Query::select(0, Expr::input(0) + Expr::int(3), ScalarKind::I64);
        let out = exec(&q, 6, 3, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![4, -1, 12]);
        assert_eq!(out.timestamps().as_slice(), input.timestamps().as_slice());
    }

    #[test]
    fn test_range_is_half_open_on_interval_start() {
        let input = stream(ScalarKind::I64, 1, &[1, 2, 3, 4]);
        let q = Query::select(0, Expr::input(0), ScalarKind::I64);
        let out = exec(&q, 2, 4, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![1, 2]);
    }

    #[test]
    fn test_where_leaves_gaps() {
        let input = compressed(&[5, -3, 0, 7, -1], 2);
        let q = Query::filter(0, Expr::input(0).gt(Expr::int(0)));
        let out = exec(&q, 5, 5, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![5, 7]);
        assert_eq!(out.entry(1), TimestampEntry::new(3, 1));
        assert_eq!(out.et(), 5);
    }

    #[test]
    fn test_tumbling_sum_and_count() {
        let input = stream(ScalarKind::I64, 1, &[1, 2, 3, 4, 5, 6, 7]);
        let sum = Query::tumbling(0, 3, Reducer::Sum, ScalarKind::I64);
        let out = exec(&sum, 7, 4, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![6, 15]);
        assert_eq!(out.entry(1), TimestampEntry::new(3, 3));

        let count = Query::tumbling(0, 2, Reducer::Count, ScalarKind::I64);
        let out = exec(&count, 7, 4, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![2, 2, 2]);
    }

    #[test]
    fn test_sliding_window_overlaps() {
        let input = stream(ScalarKind::I64, 1, &[1; 8]);
        let q = Query::window(0, 4, 2, Reducer::Sum, ScalarKind::I64);
        let out = exec(&q, 8, 4, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![2, 4, 4, 4]);
    }

    #[test]
    fn test_average_skips_empty_windows() {
        let input = stream(ScalarKind::I64, 4, &[2, 6]);
        let q = Query::tumbling(0, 2, Reducer::Average, ScalarKind::F64);
        let routine = LoopCompiler.compile(&q).unwrap();
        let mut out = UncompressedRegion::allocate(ScalarKind::F64, 4);
        routine
            .call(0, 8, &mut out, &[RegionRef::from(&input)])
            .unwrap();
        assert_eq!(out.count(), 2);
        assert_eq!(out.get::<f64>(0), 2.0);
        assert_eq!(out.entry(0), TimestampEntry::new(2, 2));
        assert_eq!(out.et(), 8);
    }

    #[test]
    fn test_variance() {
        let input = stream(ScalarKind::I64, 1, &[2, 4, 4, 4, 5, 5, 7, 9]);
        let q = Query::tumbling(0, 8, Reducer::Variance, ScalarKind::F64);
        let routine = LoopCompiler.compile(&q).unwrap();
        let mut out = UncompressedRegion::allocate(ScalarKind::F64, 1);
        routine
            .call(0, 8, &mut out, &[RegionRef::from(&input)])
            .unwrap();
        assert!((out.get::<f64>(0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_block_fold_matches_element_fold() {
        let data: Vec<i64> = (0..50).map(|i| (i * 7) % 90 - 10).collect();
        let cmp = compressed(&data, 8);
        let plain = stream(ScalarKind::I64, 1, &data);
        for reducer in [Reducer::Sum, Reducer::Count, Reducer::StdDevState] {
            let q = Query::window(0, 20, 10, reducer, ScalarKind::I64);
            let a = exec(&q, 50, 8, &[RegionRef::from(&cmp)]);
            let b = exec(&q, 50, 8, &[RegionRef::from(&plain)]);
            assert_eq!(values(&a), values(&b), "{reducer:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_tumbling_sum_over_blocks(
            data in prop::collection::vec(-10i64..100, 1..300),
            block_size in 1usize..40,
            window in 1i64..50,
        ) {
            let cmp = compressed(&data, block_size);
            let q = Query::tumbling(0, window, Reducer::Sum, ScalarKind::I64);
            let len = data.len() as i64;
            let out = exec(&q, len, data.len() + 1, &[RegionRef::from(&cmp)]);
            let expected: Vec<i64> = data
                .chunks(window as usize)
                .take((len / window) as usize)
                .map(|c| c.iter().sum())
                .collect();
            prop_assert_eq!(values(&out), expected);
        }
    }

    #[test]
    fn test_join_overlapping_intervals() {
        let coarse = stream(ScalarKind::I64, 4, &[100, 200]);
        let fine = stream(ScalarKind::I8, 1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let q = Query::join(
            0,
            1,
            Expr::input(0) + Expr::input(1).cast(ScalarKind::I64) + Expr::int(3),
            ScalarKind::I64,
        );
        let out = exec(&q, 8, 8, &[RegionRef::from(&coarse), RegionRef::from(&fine)]);
        assert_eq!(values(&out), vec![104, 105, 106, 107, 208, 209, 210, 211]);
        assert_eq!(out.timestamps().as_slice(), fine.timestamps().as_slice());
    }

    #[test]
    fn test_outer_join_fills_missing_side() {
        // left covers (0, 4] and (8, 12], right covers (2, 6]
        let mut left = UncompressedRegion::allocate(ScalarKind::I64, 2);
        for (t, v) in [(4, 10), (12, 20)] {
            let idx = left.commit_with_period(t, 4).unwrap();
            left.put_value(idx, Value::Int(v));
        }
        let mut right = UncompressedRegion::allocate(ScalarKind::I64, 1);
        let idx = right.commit_with_period(6, 4).unwrap();
        right.put_value(idx, Value::Int(1));

        let q = Query::outer_join(
            0,
            1,
            Expr::input(0) + Expr::input(1),
            Value::Int(0),
            ScalarKind::I64,
        );
        let out = exec(&q, 12, 8, &[RegionRef::from(&left), RegionRef::from(&right)]);
        assert_eq!(values(&out), vec![10, 11, 1, 20]);
        let spans: Vec<_> = out.timestamps().as_slice().to_vec();
        assert_eq!(
            spans,
            vec![
                TimestampEntry::new(0, 2),
                TimestampEntry::new(2, 2),
                TimestampEntry::new(4, 2),
                TimestampEntry::new(8, 4),
            ]
        );

        let inner = Query::join(0, 1, Expr::input(0) + Expr::input(1), ScalarKind::I64);
        let out = exec(&inner, 12, 8, &[RegionRef::from(&left), RegionRef::from(&right)]);
        assert_eq!(values(&out), vec![11]);
    }

    proptest! {
        #[test]
        fn prop_outer_join_of_aligned_streams_is_pointwise(
            a in prop::collection::vec(-50i64..50, 1..60),
            b in prop::collection::vec(-50i64..50, 1..60),
        ) {
            let left = stream(ScalarKind::I64, 1, &a);
            let right = stream(ScalarKind::I64, 1, &b);
            let q = Query::outer_join(
                0,
                1,
                Expr::input(0) - Expr::input(1),
                Value::Int(0),
                ScalarKind::I64,
            );
            let n = a.len().max(b.len());
            let out = exec(&q, n as i64, n, &[RegionRef::from(&left), RegionRef::from(&right)]);
            let expected: Vec<i64> = (0..n)
                .map(|k| a.get(k).copied().unwrap_or(0) - b.get(k).copied().unwrap_or(0))
                .collect();
            prop_assert_eq!(values(&out), expected);
        }
    }

    #[test]
    fn test_nested_sources_materialize() {
        let input = stream(ScalarKind::I64, 1, &[3, -1, 4, -1, 5, -9]);
        let q = Query::tumbling(
            Query::filter(0, Expr::input(0).gt(Expr::int(0))),
            3,
            Reducer::Sum,
            ScalarKind::I64,
        );
        let out = exec(&q, 6, 2, &[RegionRef::from(&input)]);
        assert_eq!(values(&out), vec![7, 5]);
    }

    #[test]
    fn test_compile_rejects_invalid_query() {
        let q = Query::select(0, Expr::input(2), ScalarKind::I64);
        assert!(matches!(
            LoopCompiler.compile(&q),
            Err(CompileError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_full_output_is_reported() {
        let input = stream(ScalarKind::I64, 1, &[1, 2, 3]);
        let q = Query::select(0, Expr::input(0), ScalarKind::I64);
        let routine = LoopCompiler.compile(&q).unwrap();
        let mut out = UncompressedRegion::allocate(ScalarKind::I64, 2);
        let err = routine
            .call(0, 3, &mut out, &[RegionRef::from(&input)])
            .unwrap_err();
        assert!(matches!(err, ExecError::Region(_)));
    }
}
