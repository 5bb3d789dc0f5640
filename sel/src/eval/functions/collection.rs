//! Sizes, slices, positions and aggregates over strings and lists

use super::{coerce_to_number, to_count, to_length};
use crate::eval::error::{FunctionError, FunctionOutcome};
use crate::eval::numeric::Number;
use crate::eval::registry::Call;
use crate::eval::value::Value;
use crate::model::PropertyRef;
use std::cmp::Ordering;

pub(super) fn builtin_size(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let value = call.non_null(0)?;
    let size = match &value {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        other => return Err(call.undefined(&[other])),
    };
    Ok(Value::Integer(size as i64))
}

enum End {
    Head,
    Tail,
}

fn slice(call: &mut Call<'_>, end: End) -> FunctionOutcome<Value> {
    let value = call.non_null(0)?;
    let count = call.non_null(1)?;
    match &value {
        Value::String(s) => {
            let size = s.chars().count();
            let n = to_length(call, &count, size)?;
            let taken: String = match end {
                End::Head => s.chars().take(n).collect(),
                End::Tail => s.chars().skip(size - n).collect(),
            };
            Ok(Value::String(taken))
        }
        Value::List(items) => {
            let n = to_length(call, &count, items.len())?;
            let taken = match end {
                End::Head => items[..n].to_vec(),
                End::Tail => items[items.len() - n..].to_vec(),
            };
            Ok(Value::List(taken))
        }
        other => Err(call.undefined(&[other, &count])),
    }
}

/// First `count` characters or items
pub(super) fn builtin_head(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    slice(call, End::Head)
}

/// Last `count` characters or items
pub(super) fn builtin_tail(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    slice(call, End::Tail)
}

/// `Index(element)` is the element's position in its list;
/// `Index(list, n)` is the item at position `n`
pub(super) fn builtin_index(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    if call.len() == 1 {
        let value = call.non_null(0)?;
        return match &value {
            Value::Element(element) => {
                let position = element.index_in(call.tracker());
                Ok(position
                    .map(|p| Value::Integer(p as i64))
                    .unwrap_or(Value::Null))
            }
            other => Err(call.undefined(&[other])),
        };
    }

    let value = call.non_null(0)?;
    let position = call.non_null(1)?;
    match &value {
        Value::List(items) => {
            let index = to_count(call, &position, items.len())?;
            items.get(index).cloned().ok_or_else(|| {
                FunctionError::index_out_of_bounds(&index.to_string(), items.len())
            })
        }
        Value::String(s) => {
            let size = s.chars().count();
            let index = to_count(call, &position, size)?;
            s.chars()
                .nth(index)
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| FunctionError::index_out_of_bounds(&index.to_string(), size))
        }
        other => Err(call.undefined(&[other, &position])),
    }
}

/// Numbers to aggregate: list items, or the named property of each
/// element item. Nulls are skipped.
fn numbers(call: &mut Call<'_>) -> FunctionOutcome<Vec<Number>> {
    let items = match call.non_null(0)? {
        Value::List(items) => items,
        other => return Err(call.undefined(&[&other])),
    };
    let property = if call.len() > 1 {
        let name = call.non_null(1)?;
        match name {
            Value::String(name) => Some(name),
            other => return Err(call.undefined(&[&Value::List(items), &other])),
        }
    } else {
        None
    };

    let mut numbers = Vec::with_capacity(items.len());
    for item in &items {
        let value = match (&property, item) {
            (Some(name), Value::Element(element)) => {
                if !element.element_type().has_property(name) {
                    return Err(FunctionError::undefined_property(
                        name,
                        element.element_type().name(),
                    ));
                }
                PropertyRef::new(element.clone(), name).content(call.tracker())?
            }
            (Some(_), other) => return Err(call.undefined(&[other])),
            (None, other) => call.content_of(other.clone())?,
        };
        if value.is_null() {
            continue;
        }
        match coerce_to_number(&value) {
            Some(n) => numbers.push(n?),
            None => return Err(call.undefined(&[&value])),
        }
    }
    Ok(numbers)
}

pub(super) fn builtin_sum(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let total = numbers(call)?
        .into_iter()
        .fold(Number::Integer(0), Number::add);
    Ok(total.into())
}

/// Mean as a decimal; null for no numbers
pub(super) fn builtin_avg(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let numbers = numbers(call)?;
    if numbers.is_empty() {
        return Ok(Value::Null);
    }
    let count = Number::Integer(numbers.len() as i64);
    let total = numbers.into_iter().fold(Number::Integer(0), Number::add);
    Ok(total.div(count, call.config().decimal_scale)?.into())
}

fn extreme(call: &mut Call<'_>, keep: Ordering) -> FunctionOutcome<Value> {
    let best = numbers(call)?
        .into_iter()
        .reduce(|best, n| if n.compare(&best) == keep { n } else { best });
    Ok(best.map(Value::from).unwrap_or(Value::Null))
}

pub(super) fn builtin_min(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    extreme(call, Ordering::Less)
}

pub(super) fn builtin_max(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    extreme(call, Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use crate::eval::context::{ContextRef, MapContext};
    use crate::eval::function::Engine;
    use crate::eval::value::Value;
    use bigdecimal::BigDecimal;
    use num_bigint::BigInt;
    use std::str::FromStr;

    fn outcome(source: &str) -> (Value, String) {
        let numbers = Value::List(vec![Value::Integer(4), Value::Integer(1), Value::Integer(7)]);
        let context: ContextRef = MapContext::with_variables([
            ("numbers", numbers),
            ("word", Value::from("sapphire")),
            ("none", Value::List(Vec::new())),
        ]);
        let result = Engine::new().evaluate(source, &context).unwrap();
        let outcome = result.outcome();
        (outcome.value.clone(), outcome.status.message.clone())
    }

    #[test]
    fn test_size() {
        assert_eq!(outcome("${ Size(word) }").0, Value::Integer(8));
        assert_eq!(outcome("${ numbers.Size }").0, Value::Integer(3));
        assert_eq!(
            outcome("${ Size(null) }").1,
            "Function Size does not accept nulls in position 0."
        );
        assert_eq!(outcome("${ Size(true) }").1, "Function Size( Boolean ) is undefined.");
    }

    #[test]
    fn test_head_and_tail() {
        assert_eq!(outcome("${ Head(word, 3) }").0, Value::from("sap"));
        assert_eq!(outcome("${ Tail(word, 4) }").0, Value::from("hire"));
        assert_eq!(outcome("${ Tail(word, 40) }").0, Value::from("sapphire"));
        assert_eq!(
            outcome("${ Tail(word, 99999999999999999999) }").0,
            Value::from("sapphire")
        );
        assert_eq!(
            outcome("${ Head(numbers, 99999999999999999999) }").0,
            Value::List(vec![Value::Integer(4), Value::Integer(1), Value::Integer(7)])
        );
        assert_eq!(
            outcome("${ Head(word, -1) }").1,
            "Index -1 is out of bounds for size 8."
        );
        assert_eq!(
            outcome("${ Tail(numbers, 2) }").0,
            Value::List(vec![Value::Integer(1), Value::Integer(7)])
        );
        assert_eq!(
            outcome("${ Tail(word, null) }").1,
            "Function Tail does not accept nulls in position 1."
        );
    }

    #[test]
    fn test_index_into_list_and_string() {
        assert_eq!(outcome("${ numbers[2] }").0, Value::Integer(7));
        assert_eq!(outcome("${ word[0] }").0, Value::from("s"));
        assert_eq!(outcome("${ numbers[3] }").1, "Index 3 is out of bounds for size 3.");
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(outcome("${ Sum(numbers) }").0, Value::Integer(12));
        assert_eq!(outcome("${ Min(numbers) }").0, Value::Integer(1));
        assert_eq!(outcome("${ numbers.Max }").0, Value::Integer(7));
        assert_eq!(
            outcome("${ Avg(numbers) }").0,
            Value::Decimal(BigDecimal::from_str("4").unwrap())
        );
        assert_eq!(outcome("${ Avg(none) }").0, Value::Null);
        assert_eq!(outcome("${ Sum(none) + 1 }").0, Value::BigInteger(BigInt::from(1)));
    }
}
