//! Built-in operators and functions

mod arithmetic;
mod collection;
mod comparison;
mod logical;
mod navigation;
mod string;
mod validation;

use super::error::{FunctionError, FunctionOutcome};
use super::numeric::Number;
use super::registry::{Arity, Call, FunctionRegistry, Implementation};
use super::value::Value;
use std::cmp::Ordering;
use std::rc::Rc;

/// Signature of a built-in
pub type BuiltinFn = fn(&mut Call<'_>) -> FunctionOutcome<Value>;

/// A built-in backed by a plain function
#[derive(Clone, Copy)]
pub struct Builtin {
    name: &'static str,
    arity: Arity,
    eval: BuiltinFn,
}

impl Builtin {
    pub const fn new(name: &'static str, arity: Arity, eval: BuiltinFn) -> Self {
        Builtin { name, arity, eval }
    }
}

impl Implementation for Builtin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn evaluate(&self, call: &mut Call<'_>) -> FunctionOutcome<Value> {
        (self.eval)(call)
    }
}

pub(crate) fn register_all(registry: &mut FunctionRegistry) {
    let builtins = [
        // Operators
        Builtin::new("Add", Arity::exactly(2), arithmetic::builtin_add),
        Builtin::new("Subtract", Arity::exactly(2), arithmetic::builtin_subtract),
        Builtin::new("Multiply", Arity::exactly(2), arithmetic::builtin_multiply),
        Builtin::new("Divide", Arity::exactly(2), arithmetic::builtin_divide),
        Builtin::new("Modulo", Arity::exactly(2), arithmetic::builtin_modulo),
        Builtin::new("Negative", Arity::exactly(1), arithmetic::builtin_negative),
        Builtin::new("Equal", Arity::exactly(2), comparison::builtin_equal),
        Builtin::new("NotEqual", Arity::exactly(2), comparison::builtin_not_equal),
        Builtin::new("LessThan", Arity::exactly(2), comparison::builtin_less_than),
        Builtin::new(
            "LessThanOrEqual",
            Arity::exactly(2),
            comparison::builtin_less_than_or_equal,
        ),
        Builtin::new("GreaterThan", Arity::exactly(2), comparison::builtin_greater_than),
        Builtin::new(
            "GreaterThanOrEqual",
            Arity::exactly(2),
            comparison::builtin_greater_than_or_equal,
        ),
        Builtin::new("And", Arity::exactly(2), logical::builtin_and),
        Builtin::new("Or", Arity::exactly(2), logical::builtin_or),
        Builtin::new("Not", Arity::exactly(1), logical::builtin_not),
        Builtin::new("Empty", Arity::exactly(1), logical::builtin_empty),
        Builtin::new("Condition", Arity::exactly(3), logical::builtin_condition),
        Builtin::new("Concat", Arity::at_least(0), string::builtin_concat),
        Builtin::new("Index", Arity::range(1, 2), collection::builtin_index),
        // Structure
        Builtin::new("This", Arity::exactly(0), navigation::builtin_this),
        Builtin::new("Parent", Arity::range(0, 1), navigation::builtin_parent),
        Builtin::new("Root", Arity::range(0, 1), navigation::builtin_root),
        Builtin::new("Content", Arity::exactly(1), navigation::builtin_content),
        Builtin::new("Validation", Arity::exactly(1), validation::builtin_validation),
        Builtin::new("Enabled", Arity::exactly(1), validation::builtin_enabled),
        Builtin::new("Severity", Arity::exactly(1), validation::builtin_severity),
        Builtin::new("Message", Arity::exactly(1), validation::builtin_message),
        // Collections
        Builtin::new("Size", Arity::exactly(1), collection::builtin_size),
        Builtin::new("Head", Arity::exactly(2), collection::builtin_head),
        Builtin::new("Tail", Arity::exactly(2), collection::builtin_tail),
        Builtin::new("Sum", Arity::range(1, 2), collection::builtin_sum),
        Builtin::new("Avg", Arity::range(1, 2), collection::builtin_avg),
        Builtin::new("Min", Arity::range(1, 2), collection::builtin_min),
        Builtin::new("Max", Arity::range(1, 2), collection::builtin_max),
        // Strings and numbers
        Builtin::new("Matches", Arity::exactly(2), string::builtin_matches),
        Builtin::new("StartsWith", Arity::exactly(2), string::builtin_starts_with),
        Builtin::new("EndsWith", Arity::exactly(2), string::builtin_ends_with),
        Builtin::new("ToUpperCase", Arity::exactly(1), string::builtin_to_upper_case),
        Builtin::new("ToLowerCase", Arity::exactly(1), string::builtin_to_lower_case),
        Builtin::new("Absolute", Arity::exactly(1), arithmetic::builtin_absolute),
    ];
    for builtin in builtins {
        registry.register(Rc::new(builtin));
    }
}

/// Number coercion: null and the empty string are zero, other strings
/// parse. `None` when the value has no numeric reading at all.
fn coerce_to_number(value: &Value) -> Option<FunctionOutcome<Number>> {
    match value {
        Value::Null => Some(Ok(Number::Integer(0))),
        Value::Integer(_) | Value::BigInteger(_) | Value::Decimal(_) => value.as_number().map(Ok),
        Value::String(s) if s.trim().is_empty() => Some(Ok(Number::Integer(0))),
        Value::String(s) => Some(Number::parse(s).ok_or_else(|| FunctionError::conversion(s))),
        _ => None,
    }
}

/// Text of a string-like operand
fn coerce_to_text(call: &Call<'_>, value: &Value) -> FunctionOutcome<String> {
    match value {
        Value::Element(_) | Value::Property(_) => Err(call.undefined(&[value])),
        other => other
            .coerce_to_string()
            .ok_or_else(|| call.undefined(&[value])),
    }
}

fn count_operand(call: &Call<'_>, value: &Value) -> FunctionOutcome<Number> {
    match coerce_to_number(value) {
        Some(number) => number,
        None => Err(call.undefined(&[value])),
    }
}

/// Operand that must be a non-negative integral number
fn to_count(call: &Call<'_>, value: &Value, size: usize) -> FunctionOutcome<usize> {
    let number = count_operand(call, value)?;
    number
        .to_index()
        .ok_or_else(|| FunctionError::index_out_of_bounds(&number.to_string(), size))
}

/// Like `to_count`, but whole counts past `size` clamp to it, however large
fn to_length(call: &Call<'_>, value: &Value, size: usize) -> FunctionOutcome<usize> {
    let number = count_operand(call, value)?;
    match number.to_index() {
        Some(n) => Ok(n.min(size)),
        None if number.is_whole() && number.compare(&Number::Integer(0)) == Ordering::Greater => {
            Ok(size)
        }
        None => Err(FunctionError::index_out_of_bounds(&number.to_string(), size)),
    }
}
