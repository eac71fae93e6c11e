// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core types for streambench
//!
//! This crate provides the foundational types shared by every streambench crate:
//!
//! - [`error`] - Error types and Result alias
//! - [`time`] - Timestamps, durations and append-only timestamp logs
//! - [`scalar`] - Element kinds, the [`Scalar`] trait and dynamic [`Value`]s
//! - [`buffer`] - Typed byte buffers that compute slot offsets internally

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]

/// Typed byte buffers with stride
pub mod buffer;
/// Error types for core operations
pub mod error;
/// Scalar element kinds and dynamic values
pub mod scalar;
/// Timestamps, durations and timestamp logs
pub mod time;

// Re-exports for convenience
pub use buffer::{ElementBuffer, PayloadBuffer};
pub use error::{CoreError, Result};
pub use scalar::{IntScalar, Scalar, ScalarKind, Value};
pub use time::{DeltaTimestamp, DeltaTimestampLog, Dur, Idx, TimestampEntry, TimestampLog, Ts};
