// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar element kinds and dynamic values
//!
//! Region buffers are untyped bytes. A [`ScalarKind`] records what they hold,
//! the [`Scalar`] trait moves Rust primitives in and out of those bytes, and
//! [`Value`] carries elements through query evaluation without generics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type stored in a region buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

impl ScalarKind {
    /// Width of one element in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    /// Whether the kind is an integer type
    #[must_use]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Whether the kind is a floating point type
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Inclusive integer range representable by the kind, `None` for floats
    #[must_use]
    pub const fn int_range(self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            Self::U8 => Some((0, u8::MAX as i64)),
            Self::F32 | Self::F64 => None,
        }
    }

    /// Short lowercase name (`i64`, `f32`, ...)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Decode one element of this kind from the front of `bytes`
    #[must_use]
    pub fn read_value(self, bytes: &[u8]) -> Value {
        match self {
            Self::I8 => i8::read_ne(bytes).to_value(),
            Self::I16 => i16::read_ne(bytes).to_value(),
            Self::I32 => i32::read_ne(bytes).to_value(),
            Self::I64 => i64::read_ne(bytes).to_value(),
            Self::U8 => u8::read_ne(bytes).to_value(),
            Self::F32 => f32::read_ne(bytes).to_value(),
            Self::F64 => f64::read_ne(bytes).to_value(),
        }
    }

    /// Encode `value` as this kind into the front of `bytes`.
    ///
    /// Integers narrow with wrapping, floats convert with `as` semantics.
    pub fn write_value(self, bytes: &mut [u8], value: Value) {
        match self {
            Self::I8 => i8::from_value(value).write_ne(bytes),
            Self::I16 => i16::from_value(value).write_ne(bytes),
            Self::I32 => i32::from_value(value).write_ne(bytes),
            Self::I64 => i64::from_value(value).write_ne(bytes),
            Self::U8 => u8::from_value(value).write_ne(bytes),
            Self::F32 => f32::from_value(value).write_ne(bytes),
            Self::F64 => f64::from_value(value).write_ne(bytes),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamically typed element value used during query evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Any integer kind, widened
    Int(i64),
    /// Any float kind, widened
    Float(f64),
    /// Predicate result
    Bool(bool),
}

impl Value {
    /// Integer view (floats truncate, booleans map to 0/1)
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::Float(v) => v as i64,
            Self::Bool(b) => b as i64,
        }
    }

    /// Float view
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Truthiness (non-zero numbers are true)
    #[must_use]
    pub fn as_bool(self) -> bool {
        match self {
            Self::Int(v) => v != 0,
            Self::Float(v) => v != 0.0,
            Self::Bool(b) => b,
        }
    }

    /// Whether the value is a float
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A fixed-width primitive that can live in a region buffer
pub trait Scalar: Copy + Send + Sync + PartialOrd + fmt::Debug + 'static {
    /// Matching element kind
    const KIND: ScalarKind;

    /// Decode from the front of `bytes` (native endian)
    fn read_ne(bytes: &[u8]) -> Self;

    /// Encode into the front of `bytes` (native endian)
    fn write_ne(self, bytes: &mut [u8]);

    /// Widen to a [`Value`]
    fn to_value(self) -> Value;

    /// Narrow from a [`Value`]
    fn from_value(value: Value) -> Self;
}

/// Integer scalars usable as base or delta of a compressed block
pub trait IntScalar: Scalar {
    /// Smallest representable value, widened
    const MIN_I64: i64;
    /// Largest representable value, widened
    const MAX_I64: i64;

    /// Widen to `i64`
    fn to_i64(self) -> i64;

    /// Narrow from `i64` with wrapping
    fn from_i64_wrapping(value: i64) -> Self;
}

macro_rules! impl_int_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                #[inline]
                fn read_ne(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_ne_bytes(buf)
                }

                #[inline]
                fn write_ne(self, bytes: &mut [u8]) {
                    bytes[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn to_value(self) -> Value {
                    Value::Int(i64::from(self))
                }

                #[inline]
                fn from_value(value: Value) -> Self {
                    value.as_i64() as $ty
                }
            }

            impl IntScalar for $ty {
                const MIN_I64: i64 = <$ty>::MIN as i64;
                const MAX_I64: i64 = <$ty>::MAX as i64;

                #[inline]
                fn to_i64(self) -> i64 {
                    i64::from(self)
                }

                #[inline]
                fn from_i64_wrapping(value: i64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

macro_rules! impl_float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                #[inline]
                fn read_ne(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_ne_bytes(buf)
                }

                #[inline]
                fn write_ne(self, bytes: &mut [u8]) {
                    bytes[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn to_value(self) -> Value {
                    Value::Float(f64::from(self))
                }

                #[inline]
                fn from_value(value: Value) -> Self {
                    value.as_f64() as $ty
                }
            }
        )*
    };
}

impl_int_scalar!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, u8 => U8);
impl_float_scalar!(f32 => F32, f64 => F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sizes_match_primitives() {
        assert_eq!(ScalarKind::I8.size(), std::mem::size_of::<i8>());
        assert_eq!(ScalarKind::I16.size(), std::mem::size_of::<i16>());
        assert_eq!(ScalarKind::I32.size(), std::mem::size_of::<i32>());
        assert_eq!(ScalarKind::I64.size(), std::mem::size_of::<i64>());
        assert_eq!(ScalarKind::U8.size(), std::mem::size_of::<u8>());
        assert_eq!(ScalarKind::F32.size(), std::mem::size_of::<f32>());
        assert_eq!(ScalarKind::F64.size(), std::mem::size_of::<f64>());
    }

    #[test]
    fn test_bytes_through_kind() {
        let mut buf = [0u8; 8];
        ScalarKind::I64.write_value(&mut buf, Value::Int(-42));
        assert_eq!(i64::read_ne(&buf), -42);
        assert_eq!(ScalarKind::I64.read_value(&buf), Value::Int(-42));

        ScalarKind::F32.write_value(&mut buf, Value::Float(1.5));
        assert_eq!(ScalarKind::F32.read_value(&buf), Value::Float(1.5));
    }

    #[test]
    fn test_narrowing_wraps() {
        assert_eq!(i8::from_value(Value::Int(130)), -126);
        assert_eq!(i8::from_i64_wrapping(256 + 7), 7);
        assert_eq!(u8::from_value(Value::Int(-1)), 255);
    }

    #[test]
    fn test_int_range() {
        assert_eq!(ScalarKind::I8.int_range(), Some((-128, 127)));
        assert_eq!(ScalarKind::U8.int_range(), Some((0, 255)));
        assert_eq!(ScalarKind::F64.int_range(), None);
    }

    #[test]
    fn test_value_views() {
        assert!(Value::Int(3).as_bool());
        assert!(!Value::Float(0.0).as_bool());
        assert_eq!(Value::Bool(true).as_i64(), 1);
        assert!((Value::Int(7).as_f64() - 7.0).abs() < f64::EPSILON);
    }
}
