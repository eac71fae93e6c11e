// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed byte buffers.
//!
//! Both buffers keep the exact memory layout of a packed C array; what they
//! add is that offsets are computed from the element kind in one place
//! instead of at every call site.

use crate::error::{CoreError, Result};
use crate::scalar::{Scalar, ScalarKind, Value};

/// Fixed-stride buffer laid out as `T[capacity]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBuffer {
    bytes: Vec<u8>,
    kind: ScalarKind,
    capacity: usize,
}

impl ElementBuffer {
    /// Allocate a zeroed buffer of `capacity` elements of `kind`
    #[must_use]
    pub fn new(kind: ScalarKind, capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity * kind.size()],
            kind,
            capacity,
        }
    }

    /// Element kind
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Capacity in elements
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stride in bytes
    #[must_use]
    pub const fn elem_size(&self) -> usize {
        self.kind.size()
    }

    /// Raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Verify that typed accesses with `T` match the buffer kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KindMismatch`] when `T::KIND` differs.
    pub fn check_kind<T: Scalar>(&self) -> Result<()> {
        if T::KIND == self.kind {
            Ok(())
        } else {
            Err(CoreError::KindMismatch {
                expected: self.kind,
                found: T::KIND,
            })
        }
    }

    #[inline]
    const fn offset(&self, idx: usize) -> usize {
        idx * self.kind.size()
    }

    /// Bytes of slot `idx`
    #[inline]
    #[must_use]
    pub fn slot(&self, idx: usize) -> &[u8] {
        let start = self.offset(idx);
        &self.bytes[start..start + self.kind.size()]
    }

    /// Mutable bytes of slot `idx`
    #[inline]
    pub fn slot_mut(&mut self, idx: usize) -> &mut [u8] {
        let start = self.offset(idx);
        let size = self.kind.size();
        &mut self.bytes[start..start + size]
    }

    /// Read slot `idx` as `T`
    #[inline]
    #[must_use]
    pub fn read<T: Scalar>(&self, idx: usize) -> T {
        debug_assert_eq!(T::KIND, self.kind);
        T::read_ne(self.slot(idx))
    }

    /// Write `value` into slot `idx`
    #[inline]
    pub fn write<T: Scalar>(&mut self, idx: usize, value: T) {
        debug_assert_eq!(T::KIND, self.kind);
        value.write_ne(self.slot_mut(idx));
    }

    /// Read slot `idx` as a [`Value`]
    #[inline]
    #[must_use]
    pub fn read_value(&self, idx: usize) -> Value {
        self.kind.read_value(self.slot(idx))
    }

    /// Write a [`Value`] into slot `idx`, converting to the buffer kind
    #[inline]
    pub fn write_value(&mut self, idx: usize, value: Value) {
        let kind = self.kind;
        kind.write_value(self.slot_mut(idx), value);
    }
}

/// Byte buffer addressed by explicit offsets, used for block payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBuffer {
    bytes: Vec<u8>,
}

impl PayloadBuffer {
    /// Allocate a zeroed payload of `len` bytes
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { bytes: vec![0; len] }
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `len` bytes starting at `offset`
    #[inline]
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    /// Mutable `len` bytes starting at `offset`
    #[inline]
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.bytes[offset..offset + len]
    }

    /// Read a `T` stored at byte `offset`
    #[inline]
    #[must_use]
    pub fn read_at<T: Scalar>(&self, offset: usize) -> T {
        T::read_ne(self.slice(offset, T::KIND.size()))
    }

    /// Write a `T` at byte `offset`
    #[inline]
    pub fn write_at<T: Scalar>(&mut self, offset: usize, value: T) {
        value.write_ne(self.slice_mut(offset, T::KIND.size()));
    }

    /// Read an element of `kind` stored at byte `offset`
    #[inline]
    #[must_use]
    pub fn read_value_at(&self, kind: ScalarKind, offset: usize) -> Value {
        kind.read_value(self.slice(offset, kind.size()))
    }

    /// Write `value` as `kind` at byte `offset`
    #[inline]
    pub fn write_value_at(&mut self, kind: ScalarKind, offset: usize, value: Value) {
        kind.write_value(self.slice_mut(offset, kind.size()), value);
    }
}
