// SPDX-License-Identifier: MIT OR Apache-2.0
//! The benchmark capability set.

use crate::error::Result;
use streambench_query::{CompiledRoutine, Query};
use streambench_region::{CompressedRegion, RegionRef, UncompressedRegion};

/// One benchmark instance: a query plus the regions it runs over.
///
/// [`BenchmarkLifecycle`](crate::BenchmarkLifecycle) drives the calls in
/// order; implementations can assume `init` precedes `execute` and
/// `execute` precedes `release`.
pub trait Benchmark: Send {
    /// Name printed in reports
    fn name(&self) -> &str;

    /// Input elements processed by one `execute`
    fn elements(&self) -> usize;

    /// Query the instance runs
    fn build_query(&self) -> Query;

    /// Allocate the regions and fill the inputs.
    ///
    /// # Errors
    ///
    /// Returns an error when a region or generator rejects its parameters.
    fn init(&mut self) -> Result<()>;

    /// Run `routine` over the instance regions.
    ///
    /// # Errors
    ///
    /// Propagates the routine's error unchanged.
    fn execute(&mut self, routine: &CompiledRoutine) -> Result<()>;

    /// Free every region, returning the bytes released
    fn release(&mut self) -> usize;

    /// Named views of the live regions, for debug dumps
    fn regions(&self) -> Vec<(String, RegionRef<'_>)> {
        Vec::new()
    }
}

/// Input region in either layout
#[derive(Debug)]
pub enum InputRegion {
    /// Per-element layout
    Uncompressed(UncompressedRegion),
    /// Base-delta block layout
    Compressed(CompressedRegion),
}

impl InputRegion {
    /// Read-only view passed to compiled routines
    #[must_use]
    pub const fn view(&self) -> RegionRef<'_> {
        match self {
            Self::Uncompressed(r) => RegionRef::Uncompressed(r),
            Self::Compressed(r) => RegionRef::Compressed(r),
        }
    }

    /// Bytes held by the region buffers
    #[must_use]
    pub fn footprint(&self) -> usize {
        match self {
            Self::Uncompressed(r) => r.footprint(),
            Self::Compressed(r) => r.footprint(),
        }
    }

    /// Free the region buffers
    pub fn release(self) -> usize {
        match self {
            Self::Uncompressed(r) => r.release(),
            Self::Compressed(r) => r.release(),
        }
    }
}
