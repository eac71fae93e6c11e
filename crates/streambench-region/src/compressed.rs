// SPDX-License-Identifier: MIT OR Apache-2.0
//! Base-delta compressed regions.
//!
//! Elements are grouped into blocks of `block_size`. A compressed block
//! stores one base value of the base kind followed by one narrow delta per
//! element; a raw block stores every element at base width. All blocks share
//! one payload buffer and are laid out back to back:
//!
//! ```text
//! | base | d0 d1 .. d63 | base | d0 d1 .. d63 | ... | base | d0 .. d7 |
//!  ^ blocks[0].start    ^ blocks[1].start             ^ leftover block
//! ```
//!
//! Each block owns one [`TimestampEntry`] anchored at its first element;
//! each element owns one [`DeltaTimestamp`] offset from that anchor.

use crate::error::{RegionError, Result};
use serde::{Deserialize, Serialize};
use streambench_core::{
    DeltaTimestamp, DeltaTimestampLog, PayloadBuffer, ScalarKind, TimestampEntry, TimestampLog,
    Ts, Value,
};
use tracing::debug;

/// Which blocks of a region are stored base-delta compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionPolicy {
    /// Every block is compressed
    #[default]
    Always,
    /// Every block is raw
    Never,
    /// Blocks whose index is a multiple of `n` are compressed, the rest raw
    EveryNth(usize),
}

impl CompressionPolicy {
    /// Whether block `block` is compressed under this policy
    #[must_use]
    pub const fn is_compressed(self, block: usize) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::EveryNth(n) => n != 0 && block % n == 0,
        }
    }
}

/// Placement of one block inside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Byte offset of the block's first byte
    pub start: usize,
    /// Byte offset where the next block starts
    pub next_start: usize,
    /// Number of elements in the block
    pub len: u32,
    /// Whether the block is base-delta compressed
    pub compressed: bool,
}

impl BlockMeta {
    /// Bytes occupied by the block
    #[must_use]
    pub const fn payload_size(&self) -> usize {
        self.next_start - self.start
    }
}

/// Payload bytes of a block holding `n` elements.
///
/// `size(base) + n * size(delta)` when compressed, `n * size(base)` otherwise.
#[must_use]
pub const fn block_payload_size(
    base: ScalarKind,
    delta: ScalarKind,
    n: usize,
    compressed: bool,
) -> usize {
    if compressed {
        base.size() + n * delta.size()
    } else {
        n * base.size()
    }
}

/// Block-structured region whose blocks share one payload buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedRegion {
    block_size: usize,
    len: usize,
    count: usize,
    num_blocks: usize,
    base_kind: ScalarKind,
    delta_kind: ScalarKind,
    policy: CompressionPolicy,
    blocks: Vec<BlockMeta>,
    timestamps: TimestampLog,
    delta_timestamps: DeltaTimestampLog,
    payload: PayloadBuffer,
}

impl CompressedRegion {
    /// Allocate a region for exactly `len` elements.
    ///
    /// # Errors
    ///
    /// [`RegionError::NotInteger`] for float base/delta kinds and
    /// [`RegionError::InvalidLayout`] when the delta kind is not narrower
    /// than the base kind, `block_size` is zero or the policy is
    /// `EveryNth(0)`.
    pub fn allocate(
        base_kind: ScalarKind,
        delta_kind: ScalarKind,
        len: usize,
        block_size: usize,
        policy: CompressionPolicy,
    ) -> Result<Self> {
        if !base_kind.is_integer() {
            return Err(RegionError::NotInteger {
                role: "base",
                kind: base_kind,
            });
        }
        if !delta_kind.is_integer() {
            return Err(RegionError::NotInteger {
                role: "delta",
                kind: delta_kind,
            });
        }
        if delta_kind.size() >= base_kind.size() {
            return Err(RegionError::InvalidLayout(format!(
                "delta kind {delta_kind} must be narrower than base kind {base_kind}"
            )));
        }
        if block_size == 0 || u32::try_from(block_size).is_err() {
            return Err(RegionError::InvalidLayout(format!(
                "block size {block_size} out of range"
            )));
        }
        if policy == CompressionPolicy::EveryNth(0) {
            return Err(RegionError::InvalidLayout(
                "every-nth policy needs n > 0".to_string(),
            ));
        }

        let num_blocks = len.div_ceil(block_size);
        let payload_len = (0..num_blocks)
            .map(|k| {
                let n = block_len(len, block_size, k);
                block_payload_size(base_kind, delta_kind, n, policy.is_compressed(k))
            })
            .sum();
        debug!(
            %base_kind,
            %delta_kind,
            len,
            block_size,
            num_blocks,
            payload_len,
            "allocating compressed region"
        );

        Ok(Self {
            block_size,
            len,
            count: 0,
            num_blocks,
            base_kind,
            delta_kind,
            policy,
            blocks: Vec::with_capacity(num_blocks),
            timestamps: TimestampLog::with_capacity(num_blocks),
            delta_timestamps: DeltaTimestampLog::with_capacity(len),
            payload: PayloadBuffer::new(payload_len),
        })
    }

    /// Elements in block `k`: `block_size`, or the remainder for the leftover block
    #[must_use]
    pub const fn block_elems(&self, k: usize) -> usize {
        block_len(self.len, self.block_size, k)
    }

    /// Number of blocks holding exactly `block_size` elements
    #[must_use]
    pub const fn full_blocks(&self) -> usize {
        self.len / self.block_size
    }

    /// Elements in the trailing short block, 0 when `len` divides evenly
    #[must_use]
    pub const fn leftover(&self) -> usize {
        self.len % self.block_size
    }

    /// Payload bytes of a block of `n` elements in this region's kinds
    #[must_use]
    pub const fn block_payload_size(&self, n: usize, compressed: bool) -> usize {
        block_payload_size(self.base_kind, self.delta_kind, n, compressed)
    }

    /// Commit block `k` with its timestamp anchor.
    ///
    /// Blocks are committed in index order and each one starts where the
    /// previous block ends.
    ///
    /// # Errors
    ///
    /// [`RegionError::BlocksExhausted`], [`RegionError::BlockOutOfOrder`],
    /// [`RegionError::PolicyMismatch`] or [`RegionError::PayloadOverflow`]
    /// when the block does not continue the layout sized at allocation, and
    /// [`RegionError::Core`] when the anchor does not advance.
    pub fn commit_block(
        &mut self,
        k: usize,
        anchor: TimestampEntry,
        compressed: bool,
    ) -> Result<BlockMeta> {
        let committed = self.blocks.len();
        if committed == self.num_blocks {
            return Err(RegionError::BlocksExhausted {
                num_blocks: self.num_blocks,
            });
        }
        if k != committed {
            return Err(RegionError::BlockOutOfOrder {
                expected: committed,
                found: k,
            });
        }
        let expected = self.policy.is_compressed(k);
        if compressed != expected {
            return Err(RegionError::PolicyMismatch {
                block: k,
                expected,
                found: compressed,
            });
        }

        let n = self.block_elems(k);
        let start = self.blocks.last().map_or(0, |b| b.next_start);
        let next_start = start + self.block_payload_size(n, compressed);
        if next_start > self.payload.len() {
            return Err(RegionError::PayloadOverflow {
                needed: next_start,
                available: self.payload.len(),
            });
        }

        self.timestamps.push(anchor)?;
        let meta = BlockMeta {
            start,
            next_start,
            len: n as u32,
            compressed,
        };
        self.blocks.push(meta);
        Ok(meta)
    }

    /// Record the delta timestamp of element `idx`.
    ///
    /// # Errors
    ///
    /// [`RegionError::ElementOutOfOrder`] unless `idx` is the next element
    /// and [`RegionError::BlockNotCommitted`] when its block is not committed.
    pub fn commit_element(&mut self, idx: usize, delta: DeltaTimestamp) -> Result<()> {
        if idx != self.count {
            return Err(RegionError::ElementOutOfOrder {
                expected: self.count,
                found: idx,
            });
        }
        let block = self.block_of(idx);
        if block >= self.blocks.len() {
            return Err(RegionError::BlockNotCommitted {
                element: idx,
                block,
            });
        }
        self.delta_timestamps.push(delta)?;
        self.count += 1;
        Ok(())
    }

    /// Block index of element `idx`
    #[inline]
    #[must_use]
    pub const fn block_of(&self, idx: usize) -> usize {
        idx / self.block_size
    }

    #[inline]
    fn element_offset(&self, idx: usize) -> (BlockMeta, usize) {
        let meta = self.blocks[self.block_of(idx)];
        let j = idx % self.block_size;
        let offset = if meta.compressed {
            meta.start + self.base_kind.size() + j * self.delta_kind.size()
        } else {
            meta.start + j * self.base_kind.size()
        };
        (meta, offset)
    }

    /// Mutable base bytes of compressed block `k`
    pub fn fetch_base_mut(&mut self, k: usize) -> &mut [u8] {
        let meta = self.blocks[k];
        debug_assert!(meta.compressed);
        self.payload.slice_mut(meta.start, self.base_kind.size())
    }

    /// Mutable delta bytes of element `idx` in a compressed block
    pub fn fetch_delta_mut(&mut self, idx: usize) -> &mut [u8] {
        let (meta, offset) = self.element_offset(idx);
        debug_assert!(meta.compressed);
        self.payload.slice_mut(offset, self.delta_kind.size())
    }

    /// Mutable value bytes of element `idx` in a raw block
    pub fn fetch_raw_mut(&mut self, idx: usize) -> &mut [u8] {
        let (meta, offset) = self.element_offset(idx);
        debug_assert!(!meta.compressed);
        self.payload.slice_mut(offset, self.base_kind.size())
    }

    /// Store the base of compressed block `k`, narrowing with wrapping
    pub fn write_base(&mut self, k: usize, base: i64) {
        let kind = self.base_kind;
        kind.write_value(self.fetch_base_mut(k), Value::Int(base));
    }

    /// Store the delta of element `idx`, narrowing with wrapping
    pub fn write_delta(&mut self, idx: usize, delta: i64) {
        let kind = self.delta_kind;
        kind.write_value(self.fetch_delta_mut(idx), Value::Int(delta));
    }

    /// Store the full value of element `idx` in a raw block
    pub fn write_raw(&mut self, idx: usize, value: i64) {
        let kind = self.base_kind;
        kind.write_value(self.fetch_raw_mut(idx), Value::Int(value));
    }

    /// Base of compressed block `k`
    #[must_use]
    pub fn base(&self, k: usize) -> i64 {
        let meta = self.blocks[k];
        self.payload
            .read_value_at(self.base_kind, meta.start)
            .as_i64()
    }

    /// Delta of element `idx` in a compressed block
    #[must_use]
    pub fn delta(&self, idx: usize) -> i64 {
        let (_, offset) = self.element_offset(idx);
        self.payload.read_value_at(self.delta_kind, offset).as_i64()
    }

    /// Reconstructed value of element `idx`
    #[must_use]
    pub fn value(&self, idx: usize) -> i64 {
        let (meta, offset) = self.element_offset(idx);
        if meta.compressed {
            let base = self
                .payload
                .read_value_at(self.base_kind, meta.start)
                .as_i64();
            base + self.payload.read_value_at(self.delta_kind, offset).as_i64()
        } else {
            self.payload.read_value_at(self.base_kind, offset).as_i64()
        }
    }

    /// Reconstructed value of element `idx` as a [`Value`]
    #[must_use]
    pub fn get_value(&self, idx: usize) -> Value {
        Value::Int(self.value(idx))
    }

    /// Sum of every element of committed block `k`.
    ///
    /// Compressed blocks need one multiply plus the delta sum.
    #[must_use]
    pub fn block_sum(&self, k: usize) -> i64 {
        let meta = self.blocks[k];
        let first = k * self.block_size;
        let n = meta.len as usize;
        if meta.compressed {
            let deltas: i64 = (first..first + n).map(|i| self.delta(i)).sum();
            self.base(k) * n as i64 + deltas
        } else {
            (first..first + n).map(|i| self.value(i)).sum()
        }
    }

    /// Timestamp entry of element `idx`
    #[must_use]
    pub fn element_entry(&self, idx: usize) -> TimestampEntry {
        self.delta_timestamps[idx].resolve(&self.timestamps[self.block_of(idx)])
    }

    /// Timestamp anchor of block `k`
    #[must_use]
    pub fn block_entry(&self, k: usize) -> TimestampEntry {
        self.timestamps[k]
    }

    /// Committed elements in index order
    pub fn iter(&self) -> impl Iterator<Item = (TimestampEntry, i64)> + '_ {
        (0..self.count).map(|i| (self.element_entry(i), self.value(i)))
    }

    /// Committed block metadata
    #[must_use]
    pub fn blocks(&self) -> &[BlockMeta] {
        &self.blocks
    }

    /// Number of blocks sized at allocation
    #[must_use]
    pub const fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Allocated payload length in bytes
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Payload bytes
    #[must_use]
    pub fn payload(&self) -> &PayloadBuffer {
        &self.payload
    }

    /// Elements per full block
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Element count fixed at allocation
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the region was sized for zero elements
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements committed so far
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Base kind
    #[must_use]
    pub const fn base_kind(&self) -> ScalarKind {
        self.base_kind
    }

    /// Delta kind
    #[must_use]
    pub const fn delta_kind(&self) -> ScalarKind {
        self.delta_kind
    }

    /// Compression policy
    #[must_use]
    pub const fn policy(&self) -> CompressionPolicy {
        self.policy
    }

    /// Per-block timestamp anchors
    #[must_use]
    pub const fn timestamps(&self) -> &TimestampLog {
        &self.timestamps
    }

    /// Per-element delta timestamps
    #[must_use]
    pub const fn delta_timestamps(&self) -> &DeltaTimestampLog {
        &self.delta_timestamps
    }

    /// Start time: the first block anchor, 0 before any block is committed
    #[must_use]
    pub fn st(&self) -> Ts {
        self.timestamps.get(0).map_or(0, |e| e.t)
    }

    /// End time: the end of the last committed element
    #[must_use]
    pub fn et(&self) -> Ts {
        self.count
            .checked_sub(1)
            .map_or_else(|| self.st(), |last| self.element_entry(last).end())
    }

    /// Bytes owned by the region's buffers
    #[must_use]
    pub fn footprint(&self) -> usize {
        self.payload.len()
            + self.blocks.capacity() * std::mem::size_of::<BlockMeta>()
            + self.timestamps.capacity() * std::mem::size_of::<TimestampEntry>()
            + self.delta_timestamps.capacity() * std::mem::size_of::<DeltaTimestamp>()
    }

    /// Free every buffer owned by the region, returning the bytes released
    pub fn release(self) -> usize {
        let bytes = self.footprint();
        debug!(
            count = self.count,
            blocks = self.blocks.len(),
            bytes,
            "releasing compressed region"
        );
        bytes
    }
}

const fn block_len(len: usize, block_size: usize, k: usize) -> usize {
    let first = k * block_size;
    if first + block_size <= len {
        block_size
    } else {
        len.saturating_sub(first)
    }
}
