// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synthetic stream generators for streambench
//!
//! Generators materialize seeded random streams straight into regions:
//!
//! - [`uniform`] - periodic stream of uniformly distributed values
//! - [`block`] - block-correlated stream for base-delta compressed regions
//!
//! The same seed always produces the same region contents.

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

/// Block-correlated generator for compressed regions
pub mod block;
/// Generator error types
pub mod error;
/// Uniform generator for uncompressed regions
pub mod uniform;

pub use block::BlockCorrelatedStream;
pub use error::{DatagenError, Result};
pub use uniform::UniformStream;

/// A generator that fills one kind of region
pub trait Dataset {
    /// Region layout the generator writes
    type Region;

    /// Commit every generated element into `region`.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Config`] when the generator parameters do not
    /// fit the region, before any element is written.
    fn fill(&mut self, region: &mut Self::Region) -> Result<()>;
}

pub(crate) fn check_fits(
    what: &str,
    kind: streambench_core::ScalarKind,
    lo: i64,
    hi: i64,
) -> Result<()> {
    if let Some((min, max)) = kind.int_range()
        && (lo < min || hi > max)
    {
        return Err(DatagenError::Config(format!(
            "{what} range [{lo}, {hi}] does not fit {kind}"
        )));
    }
    Ok(())
}
