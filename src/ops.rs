//! Operator folding with Java evaluation semantics
//!
//! Arithmetic follows the source language, not the host: integer operations
//! wrap on overflow, integer division and remainder by zero refuse to fold,
//! floating-point division produces infinities and NaN, and `>>>` shifts in
//! the unsigned domain. Operand widths are combined by binary numeric
//! promotion: an operation is integral when neither operand is `float` or
//! `double`, and wide when a `long` (or `double`) participates.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::value::Value;

/// Fold a unary operation over a known operand. Returns `None` when the
/// operator does not apply to the operand's type.
pub fn apply_unary(op: UnaryOperator, operand: &Value) -> Option<Value> {
    match op {
        UnaryOperator::Not => match operand {
            Value::Bool(v) => Some(Value::Bool(!v)),
            _ => None,
        },
        // Unary plus is the identity, but only on numeric operands
        UnaryOperator::Plus => operand.is_number().then(|| operand.clone()),
        UnaryOperator::Minus => match operand {
            Value::Int(v) => Some(Value::Int(v.wrapping_neg())),
            Value::Long(v) => Some(Value::Long(v.wrapping_neg())),
            Value::Float(v) => Some(Value::Float(-v)),
            Value::Double(v) => Some(Value::Double(-v)),
            // Narrow integral operands promote to int first
            Value::Short(v) => Some(Value::Int((*v as i32).wrapping_neg())),
            Value::Byte(v) => Some(Value::Int((*v as i32).wrapping_neg())),
            Value::Char(v) => Some(Value::Int((*v as i32).wrapping_neg())),
            _ => None,
        },
        UnaryOperator::BitwiseNot => match operand {
            Value::Int(v) => Some(Value::Int(!v)),
            Value::Long(v) => Some(Value::Long(!v)),
            Value::Short(v) => Some(Value::Int(!(*v as i32))),
            Value::Byte(v) => Some(Value::Int(!(*v as i32))),
            Value::Char(v) => Some(Value::Int(!(*v as i32))),
            _ => None,
        },
    }
}

/// Fold a binary operation over two known operands. Returns `None` when the
/// operator does not apply to the operand types, or when folding would
/// require raising (integer division by zero).
pub fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> Option<Value> {
    // Logical and boolean-bitwise operators
    if let (Value::Bool(l), Value::Bool(r)) = (left, right) {
        return match op {
            BinaryOperator::And | BinaryOperator::BitwiseAnd => Some(Value::Bool(*l && *r)),
            BinaryOperator::Or | BinaryOperator::BitwiseOr => Some(Value::Bool(*l || *r)),
            BinaryOperator::BitwiseXor => Some(Value::Bool(l ^ r)),
            BinaryOperator::Equal => Some(Value::Bool(l == r)),
            BinaryOperator::NotEqual => Some(Value::Bool(l != r)),
            _ => None,
        };
    }

    // String concatenation folds even when only one side is a string; the
    // other operand is rendered the way Java's `+` would render it
    if op == BinaryOperator::Add
        && (matches!(left, Value::String(_)) || matches!(right, Value::String(_)))
    {
        return Some(Value::String(format!("{left}{right}")));
    }

    if let (Value::String(l), Value::String(r)) = (left, right) {
        return match op {
            BinaryOperator::Equal => Some(Value::Bool(l == r)),
            BinaryOperator::NotEqual => Some(Value::Bool(l != r)),
            _ => None,
        };
    }

    if !left.is_number() || !right.is_number() {
        return None;
    }

    let is_integer = !left.is_floating() && !right.is_floating();
    if is_integer {
        let is_wide = matches!(left, Value::Long(_)) || matches!(right, Value::Long(_));
        if is_wide {
            fold_long(op, left.as_i64()?, right.as_i64()?)
        } else {
            fold_int(op, left.as_i32()?, right.as_i32()?)
        }
    } else {
        let is_wide = matches!(left, Value::Double(_)) || matches!(right, Value::Double(_));
        if is_wide {
            fold_double(op, left.as_f64()?, right.as_f64()?)
        } else {
            fold_float(op, left.as_f32()?, right.as_f32()?)
        }
    }
}

fn fold_int(op: BinaryOperator, l: i32, r: i32) -> Option<Value> {
    let v = match op {
        BinaryOperator::Add => l.wrapping_add(r),
        BinaryOperator::Subtract => l.wrapping_sub(r),
        BinaryOperator::Multiply => l.wrapping_mul(r),
        BinaryOperator::Divide => {
            if r == 0 {
                return None;
            }
            l.wrapping_div(r)
        }
        BinaryOperator::Modulo => {
            if r == 0 {
                return None;
            }
            l.wrapping_rem(r)
        }
        // wrapping shifts mask the count mod 32, matching the JVM
        BinaryOperator::ShiftLeft => l.wrapping_shl(r as u32),
        BinaryOperator::ShiftRight => l.wrapping_shr(r as u32),
        BinaryOperator::UnsignedShiftRight => (l as u32).wrapping_shr(r as u32) as i32,
        BinaryOperator::BitwiseAnd => l & r,
        BinaryOperator::BitwiseOr => l | r,
        BinaryOperator::BitwiseXor => l ^ r,
        _ => return compare(op, l, r),
    };
    Some(Value::Int(v))
}

fn fold_long(op: BinaryOperator, l: i64, r: i64) -> Option<Value> {
    let v = match op {
        BinaryOperator::Add => l.wrapping_add(r),
        BinaryOperator::Subtract => l.wrapping_sub(r),
        BinaryOperator::Multiply => l.wrapping_mul(r),
        BinaryOperator::Divide => {
            if r == 0 {
                return None;
            }
            l.wrapping_div(r)
        }
        BinaryOperator::Modulo => {
            if r == 0 {
                return None;
            }
            l.wrapping_rem(r)
        }
        // shift counts are taken as int and masked mod 64
        BinaryOperator::ShiftLeft => l.wrapping_shl(r as u32),
        BinaryOperator::ShiftRight => l.wrapping_shr(r as u32),
        BinaryOperator::UnsignedShiftRight => (l as u64).wrapping_shr(r as u32) as i64,
        BinaryOperator::BitwiseAnd => l & r,
        BinaryOperator::BitwiseOr => l | r,
        BinaryOperator::BitwiseXor => l ^ r,
        _ => return compare(op, l, r),
    };
    Some(Value::Long(v))
}

fn fold_float(op: BinaryOperator, l: f32, r: f32) -> Option<Value> {
    let v = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        BinaryOperator::Modulo => l % r,
        _ => return compare_float(op, l, r),
    };
    Some(Value::Float(v))
}

fn fold_double(op: BinaryOperator, l: f64, r: f64) -> Option<Value> {
    let v = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        BinaryOperator::Modulo => l % r,
        _ => return compare_float(op, l, r),
    };
    Some(Value::Double(v))
}

fn compare<T: PartialOrd + PartialEq>(op: BinaryOperator, l: T, r: T) -> Option<Value> {
    let v = match op {
        BinaryOperator::Equal => l == r,
        BinaryOperator::NotEqual => l != r,
        BinaryOperator::LessThan => l < r,
        BinaryOperator::LessThanOrEqual => l <= r,
        BinaryOperator::GreaterThan => l > r,
        BinaryOperator::GreaterThanOrEqual => l >= r,
        _ => return None,
    };
    Some(Value::Bool(v))
}

// PartialOrd on floats already gives Java comparison semantics: every
// comparison involving NaN is false
fn compare_float<T: PartialOrd + PartialEq>(op: BinaryOperator, l: T, r: T) -> Option<Value> {
    compare(op, l, r)
}
