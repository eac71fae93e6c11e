// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uncompressed regions: one fixed-width slot per element.
//!
//! Writers follow a commit-then-fetch protocol. [`UncompressedRegion::commit`]
//! reserves the next slot and records its timestamp entry, then the writer
//! fetches that slot and stores the value:
//!
//! ```
//! use streambench_core::ScalarKind;
//! use streambench_region::UncompressedRegion;
//!
//! let mut reg = UncompressedRegion::allocate(ScalarKind::I64, 3);
//! for i in 0..3i64 {
//!     let idx = reg.commit(i + 1).unwrap();
//!     reg.put(idx, i * 10);
//! }
//! assert_eq!(reg.get::<i64>(2), 20);
//! assert_eq!(reg.get_end_idx(), 2);
//! ```

use crate::error::{RegionError, Result};
use streambench_core::{
    ElementBuffer, Idx, Scalar, ScalarKind, TimestampEntry, TimestampLog, Ts, Value,
};
use tracing::debug;

/// Slot capacity for a region expected to hold `expected_len` elements.
///
/// Rounded up to a power of two so slot indices wrap with a mask.
#[must_use]
pub fn buffer_capacity(expected_len: usize) -> usize {
    expected_len.max(1).next_power_of_two()
}

/// Fixed-capacity append buffer of raw-typed elements plus their timestamp log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncompressedRegion {
    st: Ts,
    et: Ts,
    head: Idx,
    count: usize,
    mask: usize,
    timestamps: TimestampLog,
    data: ElementBuffer,
}

impl UncompressedRegion {
    /// Allocate an empty region starting at time 0
    #[must_use]
    pub fn allocate(kind: ScalarKind, expected_len: usize) -> Self {
        Self::allocate_at(kind, expected_len, 0)
    }

    /// Allocate an empty region whose first element starts at `start`
    #[must_use]
    pub fn allocate_at(kind: ScalarKind, expected_len: usize, start: Ts) -> Self {
        let capacity = buffer_capacity(expected_len);
        debug!(%kind, expected_len, capacity, "allocating uncompressed region");
        Self {
            st: start,
            et: start,
            head: -1,
            count: 0,
            mask: capacity - 1,
            timestamps: TimestampLog::with_capacity(capacity),
            data: ElementBuffer::new(kind, capacity),
        }
    }

    /// Commit an element ending at `t`; its duration is `t - et`.
    ///
    /// Returns the slot index to fetch and write.
    ///
    /// # Errors
    ///
    /// [`RegionError::Full`] when every slot is committed and
    /// [`RegionError::NonMonotonic`] when `t <= et`.
    pub fn commit(&mut self, t: Ts) -> Result<usize> {
        let entry = TimestampEntry::new(self.et, t - self.et);
        self.commit_entry(entry)
    }

    /// Commit an element ending at `t` that covers `period`.
    ///
    /// The gap between the current end time and `t - period` stays empty.
    ///
    /// # Errors
    ///
    /// As [`commit`](Self::commit); additionally rejects intervals starting
    /// before the current end time.
    pub fn commit_with_period(&mut self, t: Ts, period: Ts) -> Result<usize> {
        if period <= 0 || t - period < self.et {
            return Err(RegionError::NonMonotonic { t, et: self.et });
        }
        self.commit_entry(TimestampEntry::new(t - period, period))
    }

    fn commit_entry(&mut self, entry: TimestampEntry) -> Result<usize> {
        if self.count == self.capacity() {
            return Err(RegionError::Full {
                capacity: self.capacity(),
            });
        }
        let t = entry.end();
        if t <= self.et {
            return Err(RegionError::NonMonotonic { t, et: self.et });
        }
        self.timestamps.push(entry)?;
        self.head = ((self.head + 1) as usize & self.mask) as Idx;
        self.count += 1;
        self.et = t;
        Ok(self.head as usize)
    }

    /// Advance the end time to `t` without producing an element
    ///
    /// # Errors
    ///
    /// [`RegionError::NonMonotonic`] when `t` is before the current end time.
    pub fn commit_null(&mut self, t: Ts) -> Result<()> {
        if t < self.et {
            return Err(RegionError::NonMonotonic { t, et: self.et });
        }
        self.et = t;
        Ok(())
    }

    /// Slot bytes of a committed index.
    ///
    /// Only call with an index returned by [`commit`](Self::commit).
    #[inline]
    #[must_use]
    pub fn fetch(&self, idx: usize) -> &[u8] {
        self.data.slot(idx & self.mask)
    }

    /// Mutable slot bytes of a committed index.
    ///
    /// Only call with an index returned by [`commit`](Self::commit).
    #[inline]
    pub fn fetch_mut(&mut self, idx: usize) -> &mut [u8] {
        self.data.slot_mut(idx & self.mask)
    }

    /// Write a typed value into a committed slot
    #[inline]
    pub fn put<T: Scalar>(&mut self, idx: usize, value: T) {
        self.data.write(idx & self.mask, value);
    }

    /// Read a typed value from a committed slot
    #[inline]
    #[must_use]
    pub fn get<T: Scalar>(&self, idx: usize) -> T {
        self.data.read(idx & self.mask)
    }

    /// Write a [`Value`] into a committed slot
    #[inline]
    pub fn put_value(&mut self, idx: usize, value: Value) {
        self.data.write_value(idx & self.mask, value);
    }

    /// Read a committed slot as a [`Value`]
    #[inline]
    #[must_use]
    pub fn get_value(&self, idx: usize) -> Value {
        self.data.read_value(idx & self.mask)
    }

    /// Timestamp entry of element `idx`
    #[inline]
    #[must_use]
    pub fn entry(&self, idx: usize) -> TimestampEntry {
        self.timestamps[idx]
    }

    /// Index of the most recently committed element, `-1` when empty
    #[must_use]
    pub const fn get_end_idx(&self) -> Idx {
        self.count as Idx - 1
    }

    /// Start time
    #[must_use]
    pub const fn st(&self) -> Ts {
        self.st
    }

    /// End time: the timestamp of the last commit
    #[must_use]
    pub const fn et(&self) -> Ts {
        self.et
    }

    /// Most recently written slot, `-1` when empty
    #[must_use]
    pub const fn head(&self) -> Idx {
        self.head
    }

    /// Number of committed elements
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Whether no element is committed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slot capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Element kind
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        self.data.kind()
    }

    /// Timestamp log
    #[must_use]
    pub const fn timestamps(&self) -> &TimestampLog {
        &self.timestamps
    }

    /// Backing element buffer
    #[must_use]
    pub const fn data(&self) -> &ElementBuffer {
        &self.data
    }

    /// Committed elements in index order
    pub fn iter(&self) -> impl Iterator<Item = (TimestampEntry, Value)> + '_ {
        (0..self.count).map(|i| (self.entry(i), self.get_value(i)))
    }

    /// Bytes owned by the region's buffers
    #[must_use]
    pub fn footprint(&self) -> usize {
        self.data.as_bytes().len()
            + self.timestamps.capacity() * std::mem::size_of::<TimestampEntry>()
    }

    /// Free every buffer owned by the region, returning the bytes released
    pub fn release(self) -> usize {
        let bytes = self.footprint();
        debug!(count = self.count, bytes, "releasing uncompressed region");
        bytes
    }
}
