//! Operator dispatch.
//!
//! Binary operators dispatch on the LEFT operand's type: each type block
//! decides what right-operand types it accepts and what the result is.
//! Comparisons are the exception — every type pair compares through the
//! shared comparator, so relational operators never fail.
//!
//! Numeric rules: Int arithmetic wraps on overflow; mixing Int and Real
//! promotes to Real; Int division and modulo by zero, and Real division
//! by zero, are fatal. Shifts and bitwise operators are Int-only and a
//! negative shift count is fatal.

use std::cmp::Ordering;

use reed_ir::BinaryOp;

use crate::compare::{compare, values_equal};
use crate::errors::{self, EvalResult};
use crate::value::Value;

/// Apply a binary operator to two values.
pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    if op.is_comparison() {
        return Ok(comparison(op, left, right));
    }
    match left {
        Value::Int(l) => int_binary(op, *l, right),
        Value::Real(l) => real_binary(op, *l, right),
        Value::Str(_) => str_binary(op, left, right),
        Value::Nil => nil_binary(op, right),
        Value::Bool(_) | Value::Object(_) | Value::Func(_) | Value::Array(_) => {
            Err(errors::operation_not_supported(left.type_name(), op.symbol()))
        }
    }
}

fn comparison(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let result = match op {
        BinaryOp::Eq => values_equal(left, right),
        BinaryOp::NotEq => !values_equal(left, right),
        BinaryOp::Lt => compare(left, right) == Ordering::Less,
        BinaryOp::LtEq => compare(left, right) != Ordering::Greater,
        BinaryOp::Gt => compare(left, right) == Ordering::Greater,
        BinaryOp::GtEq => compare(left, right) != Ordering::Less,
        _ => unreachable!("caller filters on is_comparison"),
    };
    Value::Bool(result)
}

fn int_binary(op: BinaryOp, l: i64, right: &Value) -> EvalResult {
    // Int promotes when the right side is Real.
    if let Value::Real(r) = right {
        #[expect(clippy::cast_precision_loss, reason = "promotion to Real is the language rule")]
        return real_binary(op, l as f64, &Value::Real(*r));
    }
    let Value::Int(r) = right else {
        return Err(errors::operation_not_supported("Int", op.symbol()));
    };
    let r = *r;
    let result = match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(errors::division_by_zero());
            }
            l.wrapping_div(r)
        }
        BinaryOp::Mod => {
            if r == 0 {
                return Err(errors::modulo_by_zero());
            }
            l.wrapping_rem(r)
        }
        BinaryOp::Shl => return shift(l, r, ShiftDir::Left),
        BinaryOp::Shr => return shift(l, r, ShiftDir::Right),
        BinaryOp::BitAnd => l & r,
        BinaryOp::BitOr => l | r,
        BinaryOp::BitXor => l ^ r,
        _ => unreachable!("comparisons handled by the caller"),
    };
    Ok(Value::Int(result))
}

enum ShiftDir {
    Left,
    Right,
}

fn shift(l: i64, r: i64, dir: ShiftDir) -> EvalResult {
    if r < 0 {
        return Err(errors::negative_shift());
    }
    // Shifting past the width saturates rather than wrapping the count.
    let result = match dir {
        ShiftDir::Left => {
            if r >= 64 {
                0
            } else {
                #[expect(clippy::cast_possible_truncation, reason = "bounded by the width check")]
                l.wrapping_shl(r as u32)
            }
        }
        ShiftDir::Right => {
            if r >= 64 {
                l >> 63
            } else {
                #[expect(clippy::cast_possible_truncation, reason = "bounded by the width check")]
                l.wrapping_shr(r as u32)
            }
        }
    };
    Ok(Value::Int(result))
}

fn real_binary(op: BinaryOp, l: f64, right: &Value) -> EvalResult {
    let Some(r) = right.as_real() else {
        return Err(errors::operation_not_supported("Real", op.symbol()));
    };
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(errors::division_by_zero());
            }
            l / r
        }
        BinaryOp::Mod => {
            if r == 0.0 {
                return Err(errors::modulo_by_zero());
            }
            l % r
        }
        _ => return Err(errors::operation_not_supported("Real", op.symbol())),
    };
    Ok(Value::Real(result))
}

fn str_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    if op != BinaryOp::Add {
        return Err(errors::operation_not_supported("Str", op.symbol()));
    }
    let Some(l) = left.as_str() else {
        unreachable!("dispatched on Str");
    };
    match right {
        Value::Str(_) | Value::Int(_) | Value::Real(_) | Value::Bool(_) => {
            let mut out = String::with_capacity(l.len() + 8);
            out.push_str(l);
            out.push_str(&right.display_value());
            Ok(Value::string(out))
        }
        // Nil concatenates as empty.
        Value::Nil => Ok(left.clone()),
        _ => Err(errors::operation_not_supported("Str", op.symbol())),
    }
}

fn nil_binary(op: BinaryOp, right: &Value) -> EvalResult {
    // Nil + "s" is "s": Nil acts as the empty string on the left of a
    // concatenation. Everything else on Nil is an error.
    match (op, right) {
        (BinaryOp::Add, Value::Str(_)) => Ok(right.clone()),
        _ => Err(errors::operation_not_supported("Nil", op.symbol())),
    }
}

/// Apply a unary operator.
pub fn evaluate_unary(op: reed_ir::UnaryOp, value: &Value) -> EvalResult {
    use reed_ir::UnaryOp;
    match (op, value) {
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Neg, Value::Real(r)) => Ok(Value::Real(-r)),
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::BitNot, Value::Int(n)) => Ok(Value::Int(!n)),
        (UnaryOp::Neg | UnaryOp::BitNot, v) => {
            Err(errors::operation_not_supported(v.type_name(), op.symbol()))
        }
    }
}

/// Apply `++`/`--`, returning the stepped value.
pub fn evaluate_inc_dec(op: reed_ir::IncDecOp, value: &Value) -> EvalResult {
    use reed_ir::IncDecOp;
    let delta: i64 = match op {
        IncDecOp::Incr => 1,
        IncDecOp::Decr => -1,
    };
    match value {
        Value::Int(n) => Ok(Value::Int(n.wrapping_add(delta))),
        #[expect(clippy::cast_precision_loss, reason = "delta is ±1")]
        Value::Real(r) => Ok(Value::Real(r + delta as f64)),
        v => Err(errors::operation_not_supported(v.type_name(), op.symbol())),
    }
}
