//! Boolean operators, `empty` and the conditional

use crate::eval::error::FunctionOutcome;
use crate::eval::registry::Call;
use crate::eval::value::Value;

fn truth(call: &mut Call<'_>, position: usize) -> FunctionOutcome<bool> {
    let value = call.content(position)?;
    value.coerce_to_bool().ok_or_else(|| call.undefined(&[&value]))
}

/// Short-circuits: the right operand is not computed when the left decides
pub(super) fn builtin_and(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(truth(call, 0)? && truth(call, 1)?))
}

pub(super) fn builtin_or(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(truth(call, 0)? || truth(call, 1)?))
}

pub(super) fn builtin_not(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(!truth(call, 0)?))
}

pub(super) fn builtin_empty(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(call.content(0)?.is_empty_value()))
}

/// Only the chosen branch is computed. The branch is passed through
/// unchanged, so a property stays a property.
pub(super) fn builtin_condition(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    if truth(call, 0)? {
        call.operand(1)
    } else {
        call.operand(2)
    }
}
