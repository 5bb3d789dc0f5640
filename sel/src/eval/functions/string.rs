//! String functions and template concatenation

use super::coerce_to_text;
use crate::eval::error::{FunctionError, FunctionOutcome};
use crate::eval::registry::Call;
use crate::eval::value::Value;
use regex::Regex;

fn text(call: &mut Call<'_>, position: usize) -> FunctionOutcome<String> {
    let value = call.non_null(position)?;
    coerce_to_text(call, &value)
}

/// Joins every operand as text; nulls contribute nothing
pub(super) fn builtin_concat(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let mut out = String::new();
    for position in 0..call.len() {
        let value = call.content(position)?;
        out.push_str(&coerce_to_text(call, &value)?);
    }
    Ok(Value::String(out))
}

/// Whole-string regular expression match
pub(super) fn builtin_matches(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let subject = text(call, 0)?;
    let pattern = text(call, 1)?;
    let regex = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| FunctionError::invalid_pattern(&e.to_string()))?;
    Ok(Value::Boolean(regex.is_match(&subject)))
}

pub(super) fn builtin_starts_with(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let subject = text(call, 0)?;
    let prefix = text(call, 1)?;
    Ok(Value::Boolean(subject.starts_with(&prefix)))
}

pub(super) fn builtin_ends_with(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    let subject = text(call, 0)?;
    let suffix = text(call, 1)?;
    Ok(Value::Boolean(subject.ends_with(&suffix)))
}

pub(super) fn builtin_to_upper_case(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::String(text(call, 0)?.to_uppercase()))
}

pub(super) fn builtin_to_lower_case(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(Value::String(text(call, 0)?.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use crate::eval::context::{ContextRef, MapContext};
    use crate::eval::function::Engine;
    use crate::eval::value::Value;

    fn outcome(source: &str) -> (Value, String) {
        let context: ContextRef = MapContext::with_variables([
            ("name", Value::from("Sapphire")),
            ("count", Value::Integer(3)),
        ]);
        let result = Engine::new().evaluate(source, &context).unwrap();
        let outcome = result.outcome();
        (outcome.value.clone(), outcome.status.message.clone())
    }

    #[test]
    fn test_template_concatenation() {
        assert_eq!(outcome("Hello ${ name }!").0, Value::from("Hello Sapphire!"));
        assert_eq!(outcome("${ count } items").0, Value::from("3 items"));
        assert_eq!(outcome("[${ null }]").0, Value::from("[]"));
    }

    #[test]
    fn test_matches_whole_string() {
        assert_eq!(outcome("${ Matches(name, 'S[a-z]+') }").0, Value::Boolean(true));
        assert_eq!(outcome("${ Matches(name, 'S') }").0, Value::Boolean(false));
        assert!(outcome("${ Matches(name, '(') }").1.starts_with("Invalid regular expression"));
    }

    #[test]
    fn test_prefix_suffix_and_case() {
        assert_eq!(outcome("${ name.StartsWith('Sap') }").0, Value::Boolean(true));
        assert_eq!(outcome("${ EndsWith(name, 'x') }").0, Value::Boolean(false));
        assert_eq!(outcome("${ name.ToUpperCase }").0, Value::from("SAPPHIRE"));
        assert_eq!(outcome("${ ToLowerCase(name) }").0, Value::from("sapphire"));
    }

    #[test]
    fn test_null_rejected() {
        assert_eq!(
            outcome("${ StartsWith(name, null) }").1,
            "Function StartsWith does not accept nulls in position 1."
        );
    }
}
