//! Arithmetic and comparison on resolved operands.
//!
//! Two integers give a checked integer result; any float operand widens
//! the operation to floats. `/` always divides as floats.

use crate::bytecode::Opcode;
use crate::error::{Error, Result};
use crate::value::Variant;
use std::cmp::Ordering;

/// Apply a binary operator instruction.
pub(super) fn binary(op: Opcode, left: &Variant, right: &Variant) -> Result<Variant> {
    match op {
        Opcode::Add => arithmetic("+", left, right, i64::checked_add, |a, b| a + b),
        Opcode::Subtract => arithmetic("-", left, right, i64::checked_sub, |a, b| a - b),
        Opcode::Multiply => arithmetic("*", left, right, i64::checked_mul, |a, b| a * b),
        Opcode::Divide => divide(left, right),
        Opcode::Modulus => modulus(left, right),
        Opcode::Power => power(left, right),
        Opcode::Equal => Ok(Variant::Boolean(left.equals(right))),
        Opcode::NotEqual => Ok(Variant::Boolean(!left.equals(right))),
        Opcode::Less => ordering("<", left, right, Ordering::is_lt),
        Opcode::LessEqual => ordering("<=", left, right, Ordering::is_le),
        Opcode::Greater => ordering(">", left, right, Ordering::is_gt),
        Opcode::GreaterEqual => ordering(">=", left, right, Ordering::is_ge),
        Opcode::Compare => compare(left, right),
        other => Err(Error::internal(format!("{other:?} is not a binary operator"))),
    }
}

enum Operands {
    Integers(i64, i64),
    Floats(f64, f64),
}

#[allow(clippy::cast_precision_loss, reason = "mixed arithmetic widens to float")]
fn operands(op: &str, left: &Variant, right: &Variant) -> Result<Operands> {
    Ok(match (left, right) {
        (Variant::Integer(a), Variant::Integer(b)) => Operands::Integers(*a, *b),
        (Variant::Integer(a), Variant::Float(b)) => Operands::Floats(*a as f64, *b),
        (Variant::Float(a), Variant::Integer(b)) => Operands::Floats(*a, *b as f64),
        (Variant::Float(a), Variant::Float(b)) => Operands::Floats(*a, *b),
        _ => {
            return Err(Error::invalid_operands(
                op,
                &left.type_name(),
                &right.type_name(),
            ))
        }
    })
}

fn arithmetic(
    op: &str,
    left: &Variant,
    right: &Variant,
    integer: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Variant> {
    match operands(op, left, right)? {
        Operands::Integers(a, b) => integer(a, b)
            .map(Variant::Integer)
            .ok_or_else(|| Error::integer_overflow(op)),
        Operands::Floats(a, b) => Ok(Variant::Float(float(a, b))),
    }
}

#[allow(clippy::cast_precision_loss, reason = "division is always in floats")]
fn divide(left: &Variant, right: &Variant) -> Result<Variant> {
    let (a, b) = match operands("/", left, right)? {
        Operands::Integers(a, b) => (a as f64, b as f64),
        Operands::Floats(a, b) => (a, b),
    };
    if b == 0.0 {
        return Err(Error::division_by_zero());
    }
    Ok(Variant::Float(a / b))
}

fn modulus(left: &Variant, right: &Variant) -> Result<Variant> {
    match operands("%", left, right)? {
        Operands::Integers(_, 0) => Err(Error::division_by_zero()),
        Operands::Integers(a, b) => a
            .checked_rem(b)
            .map(Variant::Integer)
            .ok_or_else(|| Error::integer_overflow("%")),
        Operands::Floats(a, b) => Ok(Variant::Float(a % b)),
    }
}

#[allow(clippy::cast_precision_loss, reason = "overflowing powers fall back to float")]
fn power(left: &Variant, right: &Variant) -> Result<Variant> {
    match operands("^", left, right)? {
        Operands::Integers(a, b) => {
            let exact = u32::try_from(b).ok().and_then(|e| a.checked_pow(e));
            Ok(match exact {
                Some(value) => Variant::Integer(value),
                None => Variant::Float((a as f64).powf(b as f64)),
            })
        }
        Operands::Floats(a, b) => Ok(Variant::Float(a.powf(b))),
    }
}

fn ordering(op: &str, left: &Variant, right: &Variant, test: fn(Ordering) -> bool) -> Result<Variant> {
    let ordering = left
        .compare(right)
        .map_err(|_| Error::invalid_operands(op, &left.type_name(), &right.type_name()))?;
    Ok(Variant::Boolean(ordering.is_some_and(test)))
}

fn compare(left: &Variant, right: &Variant) -> Result<Variant> {
    match left.compare(right)? {
        Some(ordering) => Ok(Variant::Integer(ordering as i64)),
        None => Err(Error::math_error("cannot compare nan")),
    }
}

pub(super) fn negate(value: &Variant) -> Result<Variant> {
    match value {
        Variant::Integer(i) => i
            .checked_neg()
            .map(Variant::Integer)
            .ok_or_else(|| Error::integer_overflow("-")),
        Variant::Float(f) => Ok(Variant::Float(-f)),
        other => Err(Error::invalid_operand("-", &other.type_name())),
    }
}

/// Advance a numeric loop counter by `delta`.
pub(super) fn step(value: &Variant, delta: i64) -> Result<Variant> {
    if !matches!(value, Variant::Integer(_) | Variant::Float(_)) {
        return Err(Error::type_error(format!(
            "a loop counter must be a number, not a value of type {}",
            value.type_name()
        )));
    }
    binary(Opcode::Add, value, &Variant::Integer(delta))
}
