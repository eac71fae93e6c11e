// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar expressions evaluated once per element (or element pair)

use crate::error::ExecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Not, Sub};
use streambench_core::{ScalarKind, Value};

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// Expression over the current element values.
///
/// `Input(0)` is the element of a single-source operator; joins also bind
/// `Input(1)` to the right element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Value of input slot `n`
    Input(usize),
    /// Constant
    Const(Value),
    /// Binary operation
    Binary(BinOp, Box<Self>, Box<Self>),
    /// Logical negation
    Not(Box<Self>),
    /// Convert to an element kind, narrowing integers with wrapping
    Cast(ScalarKind, Box<Self>),
}

impl Expr {
    /// Value of input slot `slot`
    #[must_use]
    pub const fn input(slot: usize) -> Self {
        Self::Input(slot)
    }

    /// Integer constant
    #[must_use]
    pub const fn int(v: i64) -> Self {
        Self::Const(Value::Int(v))
    }

    /// Float constant
    #[must_use]
    pub const fn float(v: f64) -> Self {
        Self::Const(Value::Float(v))
    }

    fn binary(self, op: BinOp, rhs: Self) -> Self {
        Self::Binary(op, Box::new(self), Box::new(rhs))
    }

    /// `self > rhs`
    #[must_use]
    pub fn gt(self, rhs: Self) -> Self {
        self.binary(BinOp::Gt, rhs)
    }

    /// `self < rhs`
    #[must_use]
    pub fn lt(self, rhs: Self) -> Self {
        self.binary(BinOp::Lt, rhs)
    }

    /// `self >= rhs`
    #[must_use]
    pub fn ge(self, rhs: Self) -> Self {
        self.binary(BinOp::Ge, rhs)
    }

    /// `self == rhs`
    #[must_use]
    pub fn equals(self, rhs: Self) -> Self {
        self.binary(BinOp::Eq, rhs)
    }

    /// `self && rhs`
    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        self.binary(BinOp::And, rhs)
    }

    /// `self || rhs`
    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        self.binary(BinOp::Or, rhs)
    }

    /// Convert to `kind`
    #[must_use]
    pub fn cast(self, kind: ScalarKind) -> Self {
        Self::Cast(kind, Box::new(self))
    }

    /// Highest input slot referenced, `None` for constant expressions
    #[must_use]
    pub fn max_slot(&self) -> Option<usize> {
        match self {
            Self::Input(slot) => Some(*slot),
            Self::Const(_) => None,
            Self::Binary(_, lhs, rhs) => lhs.max_slot().max(rhs.max_slot()),
            Self::Not(e) | Self::Cast(_, e) => e.max_slot(),
        }
    }

    /// Evaluate against the bound element values.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::DivisionByZero`] for integer division by zero.
    ///
    /// # Panics
    ///
    /// Panics when an `Input` slot is not bound; compilers reject such
    /// expressions before building a routine.
    pub fn eval(&self, inputs: &[Value]) -> Result<Value, ExecError> {
        match self {
            Self::Input(slot) => Ok(inputs[*slot]),
            Self::Const(v) => Ok(*v),
            Self::Binary(op, lhs, rhs) => binary(*op, lhs.eval(inputs)?, rhs.eval(inputs)?),
            Self::Not(e) => Ok(Value::Bool(!e.eval(inputs)?.as_bool())),
            Self::Cast(kind, e) => Ok(cast(*kind, e.eval(inputs)?)),
        }
    }
}

fn binary(op: BinOp, a: Value, b: Value) -> Result<Value, ExecError> {
    let float = a.is_float() || b.is_float();
    let v = match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div if float => {
            let (x, y) = (a.as_f64(), b.as_f64());
            Value::Float(match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                _ => x / y,
            })
        }
        BinOp::Add => Value::Int(a.as_i64().wrapping_add(b.as_i64())),
        BinOp::Sub => Value::Int(a.as_i64().wrapping_sub(b.as_i64())),
        BinOp::Mul => Value::Int(a.as_i64().wrapping_mul(b.as_i64())),
        BinOp::Div => {
            let y = b.as_i64();
            if y == 0 {
                return Err(ExecError::DivisionByZero);
            }
            Value::Int(a.as_i64().wrapping_div(y))
        }
        BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Eq if float => {
            let (x, y) = (a.as_f64(), b.as_f64());
            Value::Bool(match op {
                BinOp::Gt => x > y,
                BinOp::Lt => x < y,
                BinOp::Ge => x >= y,
                _ => (x - y).abs() < f64::EPSILON,
            })
        }
        BinOp::Gt => Value::Bool(a.as_i64() > b.as_i64()),
        BinOp::Lt => Value::Bool(a.as_i64() < b.as_i64()),
        BinOp::Ge => Value::Bool(a.as_i64() >= b.as_i64()),
        BinOp::Eq => Value::Bool(a.as_i64() == b.as_i64()),
        BinOp::And => Value::Bool(a.as_bool() && b.as_bool()),
        BinOp::Or => Value::Bool(a.as_bool() || b.as_bool()),
    };
    Ok(v)
}

fn cast(kind: ScalarKind, v: Value) -> Value {
    let mut buf = [0u8; 8];
    kind.write_value(&mut buf, v);
    kind.read_value(&buf)
}

macro_rules! impl_arith {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl $trait for Expr {
                type Output = Self;

                fn $method(self, rhs: Self) -> Self {
                    self.binary(BinOp::$op, rhs)
                }
            }
        )*
    };
}

impl_arith!(Add::add => Add, Sub::sub => Sub, Mul::mul => Mul, Div::div => Div);

impl Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(slot) => write!(f, "${slot}"),
            Self::Const(Value::Float(v)) => write!(f, "{v:?}"),
            Self::Const(v) => write!(f, "{v}"),
            Self::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Not(e) => write!(f, "!{e}"),
            Self::Cast(kind, e) => write!(f, "{kind}({e})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        let e = Expr::input(0) + Expr::int(3);
        assert_eq!(e.eval(&[Value::Int(-5)]).unwrap(), Value::Int(-2));
        let e = (Expr::input(0) - Expr::input(1)) * Expr::int(2);
        assert_eq!(
            e.eval(&[Value::Int(10), Value::Int(4)]).unwrap(),
            Value::Int(12)
        );
    }

    #[test]
    fn test_float_promotion() {
        let e = Expr::input(0) / Expr::int(2);
        assert_eq!(e.eval(&[Value::Float(3.0)]).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_integer_division_by_zero() {
        let e = Expr::input(0) / Expr::int(0);
        assert!(matches!(
            e.eval(&[Value::Int(1)]),
            Err(ExecError::DivisionByZero)
        ));
    }

    #[test]
    fn test_predicates() {
        let e = Expr::input(0).gt(Expr::int(0)).and(!Expr::input(0).equals(Expr::int(7)));
        assert_eq!(e.eval(&[Value::Int(3)]).unwrap(), Value::Bool(true));
        assert_eq!(e.eval(&[Value::Int(7)]).unwrap(), Value::Bool(false));
        assert_eq!(e.eval(&[Value::Int(-1)]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_cast_wraps() {
        let e = Expr::input(0).cast(ScalarKind::I8);
        assert_eq!(e.eval(&[Value::Int(300)]).unwrap(), Value::Int(44));
        let e = Expr::input(0).cast(ScalarKind::F64);
        assert_eq!(e.eval(&[Value::Int(2)]).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_display_and_slots() {
        let e = Expr::input(0) + Expr::input(1).cast(ScalarKind::I64) + Expr::int(3);
        assert_eq!(e.to_string(), "(($0 + i64($1)) + 3)");
        assert_eq!(e.max_slot(), Some(1));
        assert_eq!(Expr::int(1).max_slot(), None);
    }

    #[test]
    fn test_display_keeps_float_constants_apart() {
        assert_eq!((Expr::input(0) / Expr::int(2)).to_string(), "($0 / 2)");
        assert_eq!((Expr::input(0) / Expr::float(2.0)).to_string(), "($0 / 2.0)");
        assert_eq!(Expr::float(-0.5).to_string(), "-0.5");
    }
}
