// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile and execution error types

use streambench_region::RegionError;
use thiserror::Error;

/// Errors raised while lowering a query to a routine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The query cannot be lowered
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// No routine is registered under the symbol
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),
}

/// Errors raised by a compiled routine
#[derive(Debug, Error)]
pub enum ExecError {
    /// Fewer input regions than the routine reads
    #[error("routine reads {expected} inputs, {found} provided")]
    MissingInput {
        /// Inputs the routine reads
        expected: usize,
        /// Inputs passed by the caller
        found: usize,
    },

    /// Integer division by zero
    #[error("integer division by zero")]
    DivisionByZero,

    /// The output region rejected a commit
    #[error(transparent)]
    Region(#[from] RegionError),
}
