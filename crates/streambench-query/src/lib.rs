// SPDX-License-Identifier: MIT OR Apache-2.0
//! Temporal queries for streambench
//!
//! Benchmarks describe their workload as a [`Query`] and hand it to a
//! [`QueryCompiler`]:
//!
//! - [`expr`] - scalar expressions over element values
//! - [`query`] - select, where, windowed reduce and join operator trees
//! - [`compiler`] - the compiler seam and the symbol-caching front end
//! - [`exec`] - the reference loop compiler
//!
//! # Example
//!
//! ```
//! use streambench_core::{ScalarKind, Value};
//! use streambench_query::{Expr, LoopCompiler, Query, QueryCompiler};
//! use streambench_region::{RegionRef, UncompressedRegion};
//!
//! let mut input = UncompressedRegion::allocate(ScalarKind::I64, 4);
//! for t in 1..=4 {
//!     let idx = input.commit(t).unwrap();
//!     input.put_value(idx, Value::Int(t));
//! }
//!
//! let query = Query::select(0, Expr::input(0) + Expr::int(3), ScalarKind::I64);
//! let routine = LoopCompiler.compile(&query).unwrap();
//! let mut output = UncompressedRegion::allocate(ScalarKind::I64, 4);
//! routine.call(0, 4, &mut output, &[RegionRef::from(&input)]).unwrap();
//! assert_eq!(output.get::<i64>(3), 7);
//! ```

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

/// Compiler seam and symbol table
pub mod compiler;
/// Compile and execution errors
pub mod error;
/// Reference loop compiler
pub mod exec;
/// Scalar expressions
pub mod expr;
/// Query operator trees
pub mod query;

pub use compiler::{CompiledRoutine, CompilerService, QueryCompiler, RoutineFn, symbol_name};
pub use error::{CompileError, ExecError};
pub use exec::LoopCompiler;
pub use expr::{BinOp, Expr};
pub use query::{Query, Reducer, Source};
