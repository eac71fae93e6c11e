// SPDX-License-Identifier: MIT OR Apache-2.0
//! Region error types

use streambench_core::{CoreError, ScalarKind, Ts};
use thiserror::Error;

/// Errors raised while allocating, committing to or dumping a region
#[derive(Debug, Error)]
pub enum RegionError {
    /// Every slot of the region is committed
    #[error("region full: capacity {capacity}")]
    Full {
        /// Slot capacity
        capacity: usize,
    },

    /// A commit timestamp did not advance past the region end time
    #[error("timestamp {t} does not advance past region end {et}")]
    NonMonotonic {
        /// Rejected timestamp
        t: Ts,
        /// Current region end time
        et: Ts,
    },

    /// Base/delta kinds or block size cannot describe a compressed layout
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// A base or delta kind is not an integer kind
    #[error("{role} kind {kind} is not an integer kind")]
    NotInteger {
        /// `base` or `delta`
        role: &'static str,
        /// Offending kind
        kind: ScalarKind,
    },

    /// Blocks must be committed in index order
    #[error("block {found} committed out of order, expected {expected}")]
    BlockOutOfOrder {
        /// Next block index
        expected: usize,
        /// Index passed by the caller
        found: usize,
    },

    /// Every block sized at allocation is already committed
    #[error("all {num_blocks} blocks already committed")]
    BlocksExhausted {
        /// Number of blocks sized at allocation
        num_blocks: usize,
    },

    /// A block's compression flag disagrees with the allocation policy
    #[error("block {block}: policy expects compressed={expected}, commit used compressed={found}")]
    PolicyMismatch {
        /// Block index
        block: usize,
        /// Flag derived from the policy
        expected: bool,
        /// Flag passed by the caller
        found: bool,
    },

    /// A block does not fit the payload sized at allocation
    #[error("payload overflow: block needs bytes up to {needed}, payload holds {available}")]
    PayloadOverflow {
        /// End offset the block needs
        needed: usize,
        /// Allocated payload length
        available: usize,
    },

    /// Elements must be committed in index order inside committed blocks
    #[error("element {found} committed out of order, expected {expected}")]
    ElementOutOfOrder {
        /// Next element index
        expected: usize,
        /// Index passed by the caller
        found: usize,
    },

    /// An element was committed before its block
    #[error("element {element} belongs to uncommitted block {block}")]
    BlockNotCommitted {
        /// Element index
        element: usize,
        /// Block the element belongs to
        block: usize,
    },

    /// Error from a core log or buffer
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error while writing a dump
    #[error("dump failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for region operations
pub type Result<T> = std::result::Result<T, RegionError>;
