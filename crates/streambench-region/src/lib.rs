// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stream regions for streambench
//!
//! A region is a stream buffer holding timestamped elements plus the
//! bookkeeping needed to append to it and to read it back:
//!
//! - [`uncompressed`] - one fixed-width slot per element
//! - [`compressed`] - base-delta blocks sharing one payload buffer
//! - [`view`] - read-only views handed to compiled routines
//! - [`dump`] - plain-text dumps for debugging

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

/// Base-delta compressed regions
pub mod compressed;
/// Plain-text region dumps
pub mod dump;
/// Region error types
pub mod error;
/// Uncompressed regions
pub mod uncompressed;
/// Read-only region views
pub mod view;

pub use compressed::{BlockMeta, CompressedRegion, CompressionPolicy, block_payload_size};
pub use error::{RegionError, Result};
pub use uncompressed::{UncompressedRegion, buffer_capacity};
pub use view::RegionRef;
