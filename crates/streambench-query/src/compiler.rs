// SPDX-License-Identifier: MIT OR Apache-2.0
//! The query-compiler collaborator seam.
//!
//! Benchmarks never depend on a concrete compiler: they hand a [`Query`] to
//! any [`QueryCompiler`] and get back a [`CompiledRoutine`], an immutable
//! callable that can be shared across worker threads.

use crate::error::{CompileError, ExecError};
use crate::query::Query;
use dashmap::DashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;
use streambench_core::Ts;
use streambench_region::{RegionRef, UncompressedRegion};
use tracing::debug;

/// Signature of a compiled query: `(start, end, output, inputs)`
pub type RoutineFn =
    dyn Fn(Ts, Ts, &mut UncompressedRegion, &[RegionRef<'_>]) -> Result<(), ExecError>
        + Send
        + Sync;

/// Cloneable handle to a compiled query
#[derive(Clone)]
pub struct CompiledRoutine {
    name: Arc<str>,
    arity: usize,
    func: Arc<RoutineFn>,
}

impl CompiledRoutine {
    /// Wrap a callable reading `arity` input regions
    #[must_use]
    pub fn new<F>(name: impl Into<Arc<str>>, arity: usize, func: F) -> Self
    where
        F: Fn(Ts, Ts, &mut UncompressedRegion, &[RegionRef<'_>]) -> Result<(), ExecError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    /// Symbol name the routine was registered under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of input regions the routine reads
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Populate `output` with the query result over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::MissingInput`] when fewer than
    /// [`arity`](Self::arity) inputs are passed, and any error the routine
    /// raises while evaluating or committing.
    pub fn call(
        &self,
        start: Ts,
        end: Ts,
        output: &mut UncompressedRegion,
        inputs: &[RegionRef<'_>],
    ) -> Result<(), ExecError> {
        if inputs.len() < self.arity {
            return Err(ExecError::MissingInput {
                expected: self.arity,
                found: inputs.len(),
            });
        }
        (self.func)(start, end, output, inputs)
    }

    /// Whether both handles share one compiled callable
    #[must_use]
    pub fn same_routine(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for CompiledRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoutine")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Lowers a query into an executable routine
pub trait QueryCompiler {
    /// Compile `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] when the query cannot be lowered.
    fn compile(&self, query: &Query) -> Result<CompiledRoutine, CompileError>;
}

/// Symbol name derived from the shape of `query`.
///
/// Structurally equal queries map to the same name.
#[must_use]
pub fn symbol_name(query: &Query) -> String {
    let hasher = ahash::RandomState::with_seeds(
        0x5354_5245_414d,
        0x4245_4e43_48,
        0x7175_6572_79,
        0x7379_6d,
    );
    format!(
        "query_{:016x}",
        BuildHasher::hash_one(&hasher, query.to_string())
    )
}

/// Compiler front end owning the symbol table of compiled routines.
///
/// Compiling a query registers its routine under [`symbol_name`]; compiling
/// a query of the same shape again returns the registered routine.
pub struct CompilerService<C> {
    backend: C,
    symbols: DashMap<String, CompiledRoutine>,
}

impl<C: QueryCompiler> CompilerService<C> {
    /// Create a service with an empty symbol table
    #[must_use]
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            symbols: DashMap::new(),
        }
    }

    /// Routine registered under `name`
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::SymbolNotFound`] when nothing is registered.
    pub fn lookup(&self, name: &str) -> Result<CompiledRoutine, CompileError> {
        self.symbols
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| CompileError::SymbolNotFound(name.to_string()))
    }

    /// Number of registered routines
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no routine is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Compiler backend
    #[must_use]
    pub const fn backend(&self) -> &C {
        &self.backend
    }
}

impl<C: QueryCompiler> QueryCompiler for CompilerService<C> {
    fn compile(&self, query: &Query) -> Result<CompiledRoutine, CompileError> {
        let name = symbol_name(query);
        if !self.symbols.contains_key(&name) {
            debug!(symbol = %name, "lowering query");
            let routine = self.backend.compile(query)?;
            self.symbols.entry(name.clone()).or_insert(routine);
        }
        self.lookup(&name)
    }
}

impl<C> fmt::Debug for CompilerService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerService")
            .field("symbols", &self.symbols.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use streambench_core::ScalarKind;

    struct Counting(AtomicUsize);

    impl QueryCompiler for Counting {
        fn compile(&self, query: &Query) -> Result<CompiledRoutine, CompileError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(CompiledRoutine::new(
                symbol_name(query),
                query.arity(),
                |_, _, _, _| Ok(()),
            ))
        }
    }

    fn plus(n: i64) -> Query {
        Query::select(0, Expr::input(0) + Expr::int(n), ScalarKind::I64)
    }

    #[test]
    fn test_same_shape_compiles_once() {
        let service = CompilerService::new(Counting(AtomicUsize::new(0)));
        let a = service.compile(&plus(3)).unwrap();
        let b = service.compile(&plus(3)).unwrap();
        assert!(a.same_routine(&b));
        assert_eq!(service.backend().0.load(Ordering::Relaxed), 1);

        let c = service.compile(&plus(4)).unwrap();
        assert!(!a.same_routine(&c));
        assert_eq!(service.len(), 2);
    }

    #[test]
    fn test_lookup_unknown_symbol() {
        let service = CompilerService::new(Counting(AtomicUsize::new(0)));
        assert_eq!(
            service.lookup("query_missing").unwrap_err(),
            CompileError::SymbolNotFound("query_missing".to_string())
        );
        let routine = service.compile(&plus(1)).unwrap();
        assert_eq!(service.lookup(routine.name()).unwrap().name(), routine.name());
    }

    #[test]
    fn test_call_checks_arity() {
        let routine = CompiledRoutine::new("two", 2, |_, _, _, _| Ok(()));
        let mut out = UncompressedRegion::allocate(ScalarKind::I64, 1);
        let input = UncompressedRegion::allocate(ScalarKind::I64, 1);
        let err = routine
            .call(0, 1, &mut out, &[RegionRef::from(&input)])
            .unwrap_err();
        assert!(matches!(
            err,
            ExecError::MissingInput {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_concurrent_compiles_share_registered_routine() {
        use rayon::prelude::*;

        let service = CompilerService::new(Counting(AtomicUsize::new(0)));
        let routines: Vec<CompiledRoutine> = (0..64)
            .into_par_iter()
            .map(|_| service.compile(&plus(7)).unwrap())
            .collect();
        assert_eq!(service.len(), 1);
        let registered = service.lookup(&symbol_name(&plus(7))).unwrap();
        assert!(routines.iter().all(|r| r.same_routine(&registered)));
    }

    #[test]
    fn test_int_and_float_constants_register_separately() {
        let halve = |divisor: Expr| {
            Query::select(0, Expr::input(0) / divisor, ScalarKind::F64)
        };
        let by_int = halve(Expr::int(2));
        let by_float = halve(Expr::float(2.0));
        assert_ne!(symbol_name(&by_int), symbol_name(&by_float));

        let service = CompilerService::new(Counting(AtomicUsize::new(0)));
        let a = service.compile(&by_int).unwrap();
        let b = service.compile(&by_float).unwrap();
        assert!(!a.same_routine(&b));
        assert_eq!(service.len(), 2);
    }

    #[test]
    fn test_symbol_name_is_stable() {
        assert_eq!(symbol_name(&plus(3)), symbol_name(&plus(3)));
        assert_ne!(symbol_name(&plus(3)), symbol_name(&plus(5)));
        assert!(symbol_name(&plus(3)).starts_with("query_"));
    }
}
