//! Arithmetic operators and `Absolute`
//!
//! Operands are coerced the JSP way: null and "" are zero, strings parse.
//! Booleans and structural values have no arithmetic.

use super::coerce_to_number;
use crate::eval::error::FunctionOutcome;
use crate::eval::numeric::Number;
use crate::eval::registry::Call;
use crate::eval::value::Value;

fn operands(call: &mut Call<'_>) -> FunctionOutcome<(Number, Number)> {
    let left = call.content(0)?;
    let right = call.content(1)?;
    match (coerce_to_number(&left), coerce_to_number(&right)) {
        (Some(a), Some(b)) => Ok((a?, b?)),
        _ => Err(call.undefined(&[&left, &right])),
    }
}

pub(super) fn builtin_add(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let (a, b) = operands(call)?;
    Ok(a.add(b).into())
}

pub(super) fn builtin_subtract(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let (a, b) = operands(call)?;
    Ok(a.sub(b).into())
}

pub(super) fn builtin_multiply(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let (a, b) = operands(call)?;
    Ok(a.mul(b).into())
}

pub(super) fn builtin_divide(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let (a, b) = operands(call)?;
    let scale = call.config().decimal_scale;
    Ok(a.div(b, scale)?.into())
}

pub(super) fn builtin_modulo(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let (a, b) = operands(call)?;
    Ok(a.rem(b)?.into())
}

pub(super) fn builtin_negative(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let value = call.content(0)?;
    match coerce_to_number(&value) {
        Some(n) => Ok(n?.neg().into()),
        None => Err(call.undefined(&[&value])),
    }
}

pub(super) fn builtin_absolute(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let value = call.non_null(0)?;
    match coerce_to_number(&value) {
        Some(n) => Ok(n?.abs().into()),
        None => Err(call.undefined(&[&value])),
    }
}
