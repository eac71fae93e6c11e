// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only region views.
//!
//! Compiled routines receive their inputs as a slice of [`RegionRef`] so one
//! calling convention covers both layouts.

use crate::compressed::CompressedRegion;
use crate::uncompressed::UncompressedRegion;
use streambench_core::{ScalarKind, TimestampEntry, Value};

/// Borrowed view of either region layout
#[derive(Debug, Clone, Copy)]
pub enum RegionRef<'a> {
    /// One slot per element
    Uncompressed(&'a UncompressedRegion),
    /// Base-delta blocks
    Compressed(&'a CompressedRegion),
}

impl RegionRef<'_> {
    /// Number of committed elements
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Uncompressed(r) => r.count(),
            Self::Compressed(r) => r.count(),
        }
    }

    /// Whether no element is committed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp entry of element `idx`
    #[inline]
    #[must_use]
    pub fn entry(&self, idx: usize) -> TimestampEntry {
        match self {
            Self::Uncompressed(r) => r.entry(idx),
            Self::Compressed(r) => r.element_entry(idx),
        }
    }

    /// Value of element `idx`
    #[inline]
    #[must_use]
    pub fn value(&self, idx: usize) -> Value {
        match self {
            Self::Uncompressed(r) => r.get_value(idx),
            Self::Compressed(r) => r.get_value(idx),
        }
    }

    /// Element kind; compressed regions report their base kind
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Uncompressed(r) => r.kind(),
            Self::Compressed(r) => r.base_kind(),
        }
    }

    /// The compressed region behind this view, if any
    #[must_use]
    pub const fn as_compressed(&self) -> Option<&CompressedRegion> {
        match *self {
            Self::Compressed(r) => Some(r),
            Self::Uncompressed(_) => None,
        }
    }
}

impl<'a> From<&'a UncompressedRegion> for RegionRef<'a> {
    fn from(region: &'a UncompressedRegion) -> Self {
        Self::Uncompressed(region)
    }
}

impl<'a> From<&'a CompressedRegion> for RegionRef<'a> {
    fn from(region: &'a CompressedRegion) -> Self {
        Self::Compressed(region)
    }
}
