//! Equality and relational operators

use super::coerce_to_number;
use crate::eval::error::FunctionOutcome;
use crate::eval::registry::Call;
use crate::eval::value::Value;
use std::cmp::Ordering;

fn is_numeric(value: &Value) -> bool {
    value.as_number().is_some()
}

/// JSP equality: nulls equal only each other, a number on either side
/// compares numerically, a boolean on either side compares as booleans,
/// a string on either side compares as text.
fn equals(call: &mut Call<'_>) -> FunctionOutcome<bool> {
    let left = call.content(0)?;
    let right = call.content(1)?;
    match (&left, &right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (a, b) if is_numeric(a) || is_numeric(b) => {
            match (coerce_to_number(a), coerce_to_number(b)) {
                (Some(x), Some(y)) => Ok(x?.compare(&y?) == Ordering::Equal),
                _ => Err(call.undefined(&[a, b])),
            }
        }
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
            match (left.coerce_to_bool(), right.coerce_to_bool()) {
                (Some(x), Some(y)) => Ok(x == y),
                _ => Err(call.undefined(&[&left, &right])),
            }
        }
        (Value::String(_), _) | (_, Value::String(_)) => {
            match (left.coerce_to_string(), right.coerce_to_string()) {
                (Some(x), Some(y)) => Ok(x == y),
                _ => Err(call.undefined(&[&left, &right])),
            }
        }
        (a, b) => Ok(a == b),
    }
}

/// Ordering for relational operators; `None` when either side is null
fn order(call: &mut Call<'_>) -> FunctionOutcome<Option<Ordering>> {
    let left = call.content(0)?;
    let right = call.content(1)?;
    match (&left, &right) {
        (Value::Null, _) | (_, Value::Null) => Ok(None),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (a, b) => match (coerce_to_number(a), coerce_to_number(b)) {
            (Some(x), Some(y)) => Ok(Some(x?.compare(&y?))),
            _ => Err(call.undefined(&[a, b])),
        },
    }
}

pub(super) fn builtin_equal(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(equals(call)?))
}

pub(super) fn builtin_not_equal(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(!equals(call)?))
}

pub(super) fn builtin_less_than(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(order(call)?.is_some_and(Ordering::is_lt)))
}

pub(super) fn builtin_less_than_or_equal(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(order(call)?.is_some_and(Ordering::is_le)))
}

pub(super) fn builtin_greater_than(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(order(call)?.is_some_and(Ordering::is_gt)))
}

pub(super) fn builtin_greater_than_or_equal(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::Boolean(order(call)?.is_some_and(Ordering::is_ge)))
}

#[cfg(test)]
mod tests {
    use crate::eval::context::{ContextRef, MapContext};
    use crate::eval::function::Engine;
    use crate::eval::value::Value;

    fn eval(source: &str) -> Value {
        let context: ContextRef = MapContext::with_variables([("n", Value::Integer(2))]);
        let result = Engine::new().evaluate(source, &context).unwrap();
        let outcome = result.outcome();
        assert!(outcome.status.is_ok(), "{source}: {}", outcome.status);
        outcome.value.clone()
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(eval("${ n == 2 }"), Value::Boolean(true));
        assert_eq!(eval("${ n eq 2.0 }"), Value::Boolean(true));
        assert_eq!(eval("${ '2' == n }"), Value::Boolean(true));
        assert_eq!(eval("${ n != 3 }"), Value::Boolean(true));
    }

    #[test]
    fn test_null_equality() {
        assert_eq!(eval("${ null == null }"), Value::Boolean(true));
        assert_eq!(eval("${ null == 0 }"), Value::Boolean(false));
    }

    #[test]
    fn test_boolean_and_string_equality() {
        assert_eq!(eval("${ 'TRUE' == true }"), Value::Boolean(true));
        assert_eq!(eval("${ 'a' == 'a' }"), Value::Boolean(true));
        assert_eq!(eval("${ 'a' ne \"b\" }"), Value::Boolean(true));
    }

    #[test]
    fn test_relational() {
        assert_eq!(eval("${ n < 3 }"), Value::Boolean(true));
        assert_eq!(eval("${ n >= 2 }"), Value::Boolean(true));
        assert_eq!(eval("${ 'apple' lt 'banana' }"), Value::Boolean(true));
        assert_eq!(eval("${ null < 1 }"), Value::Boolean(false));
        assert_eq!(eval("${ 1.5 gt n }"), Value::Boolean(false));
    }

    #[test]
    fn test_relational_undefined() {
        let context: ContextRef = MapContext::new();
        let result = Engine::new().evaluate("${ true < 1 }", &context).unwrap();
        assert_eq!(
            result.status().message,
            "Function LessThan( Boolean, BigInteger ) is undefined."
        );
    }
}
