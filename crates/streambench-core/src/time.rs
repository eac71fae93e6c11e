// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timestamps, durations and the append-only logs that index them.
//!
//! Every committed element of a region owns one [`TimestampEntry`]. An entry
//! covers the half-open interval `(t, t + d]`: `t` is where the previous
//! element ended and `t + d` is the timestamp the element was committed at.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Timestamp
pub type Ts = i64;
/// Duration between two timestamps
pub type Dur = i64;
/// Signed element index (`-1` marks an empty region)
pub type Idx = i64;

/// One timestamp/duration pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct TimestampEntry {
    /// Start of the interval covered by the element
    pub t: Ts,
    /// Length of the interval
    pub d: Dur,
}

impl TimestampEntry {
    /// Create an entry
    #[must_use]
    pub const fn new(t: Ts, d: Dur) -> Self {
        Self { t, d }
    }

    /// Timestamp the element was committed at
    #[must_use]
    pub const fn end(&self) -> Ts {
        self.t + self.d
    }
}

/// Dense, append-only sequence of [`TimestampEntry`] values with a fixed capacity.
///
/// Entry starts are strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampLog {
    entries: Vec<TimestampEntry>,
    capacity: usize,
}

impl TimestampLog {
    /// Create an empty log that can hold `capacity` entries
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogFull`] at capacity and [`CoreError::NonMonotonic`]
    /// when `entry.t` does not advance past the last entry's start.
    pub fn push(&mut self, entry: TimestampEntry) -> Result<usize> {
        if self.entries.len() == self.capacity {
            return Err(CoreError::LogFull {
                capacity: self.capacity,
            });
        }
        if let Some(last) = self.entries.last()
            && entry.t <= last.t
        {
            return Err(CoreError::NonMonotonic {
                t: entry.t,
                previous: last.t,
            });
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// Entry at `idx`, if committed
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&TimestampEntry> {
        self.entries.get(idx)
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&TimestampEntry> {
        self.entries.last()
    }

    /// Number of committed entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry has been committed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fixed capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Committed entries in index order
    #[must_use]
    pub fn as_slice(&self) -> &[TimestampEntry] {
        &self.entries
    }

    /// Iterate over committed entries
    pub fn iter(&self) -> std::slice::Iter<'_, TimestampEntry> {
        self.entries.iter()
    }
}

impl Index<usize> for TimestampLog {
    type Output = TimestampEntry;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.entries[idx]
    }
}

/// Offset of an element from its block's first timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct DeltaTimestamp {
    /// Offset of the element's interval start from the block start
    pub offset: u32,
    /// Length of the element's interval
    pub d: u32,
}

impl DeltaTimestamp {
    /// Create a delta timestamp
    #[must_use]
    pub const fn new(offset: u32, d: u32) -> Self {
        Self { offset, d }
    }

    /// Resolve against the block's anchor entry
    #[must_use]
    pub const fn resolve(&self, block: &TimestampEntry) -> TimestampEntry {
        TimestampEntry::new(block.t + self.offset as Ts, self.d as Dur)
    }
}

/// Per-element delta timestamps of a compressed region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaTimestampLog {
    entries: Vec<DeltaTimestamp>,
    capacity: usize,
}

impl DeltaTimestampLog {
    /// Create an empty log that can hold `capacity` entries
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogFull`] at capacity.
    pub fn push(&mut self, entry: DeltaTimestamp) -> Result<usize> {
        if self.entries.len() == self.capacity {
            return Err(CoreError::LogFull {
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// Entry at `idx`, if committed
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&DeltaTimestamp> {
        self.entries.get(idx)
    }

    /// Number of committed entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry has been committed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fixed capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Index<usize> for DeltaTimestampLog {
    type Output = DeltaTimestamp;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.entries[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_entry_end() {
        let e = TimestampEntry::new(10, 5);
        assert_eq!(e.end(), 15);
    }

    #[test]
    fn test_log_rejects_past_capacity() {
        let mut log = TimestampLog::with_capacity(2);
        assert_eq!(log.push(TimestampEntry::new(0, 1)), Ok(0));
        assert_eq!(log.push(TimestampEntry::new(1, 1)), Ok(1));
        assert_eq!(
            log.push(TimestampEntry::new(2, 1)),
            Err(CoreError::LogFull { capacity: 2 })
        );
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_log_rejects_non_increasing_start() {
        let mut log = TimestampLog::with_capacity(4);
        log.push(TimestampEntry::new(5, 1)).unwrap();
        assert!(matches!(
            log.push(TimestampEntry::new(5, 2)),
            Err(CoreError::NonMonotonic { t: 5, previous: 5 })
        ));
        assert!(log.push(TimestampEntry::new(4, 2)).is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_delta_resolve() {
        let block = TimestampEntry::new(640, 10);
        let delta = DeltaTimestamp::new(30, 10);
        assert_eq!(delta.resolve(&block), TimestampEntry::new(670, 10));
    }

    proptest! {
        #[test]
        fn prop_log_never_exceeds_capacity(
            capacity in 0usize..64,
            steps in proptest::collection::vec(-3i64..10, 0..128),
        ) {
            let mut log = TimestampLog::with_capacity(capacity);
            let mut t = 0;
            for step in steps {
                t += step;
                let _ = log.push(TimestampEntry::new(t, 1));
                prop_assert!(log.len() <= log.capacity());
            }
            for pair in log.as_slice().windows(2) {
                prop_assert!(pair[0].t < pair[1].t);
            }
        }
    }
}
