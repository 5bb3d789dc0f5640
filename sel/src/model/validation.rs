//! Built-in checks run before a property's expression rules

use super::schema::ValueSpec;
use crate::eval::Status;
use bigdecimal::BigDecimal;

/// Label with its first letter capitalized, to start a sentence
fn sentence(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Required, type, range and possible value checks on a value property's
/// effective text
pub(crate) fn check_value(label: &str, spec: &ValueSpec, text: Option<&str>) -> Status {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => {
            return if spec.required {
                Status::error(format!("{} must be specified.", sentence(label)))
            } else {
                Status::ok()
            };
        }
    };

    let Some(value) = spec.value_type.parse(text) else {
        return Status::error(format!(
            "\"{text}\" is not a valid {}.",
            spec.value_type.describe()
        ));
    };

    if spec.value_type.is_numeric() {
        if let Some(number) = value.as_number().map(|n| n.to_decimal()) {
            if let Some(status) = check_range(&number, spec) {
                return status;
            }
        }
    }

    if !spec.possible_values.is_empty() && !spec.possible_values.iter().any(|p| p == text) {
        return Status::error(format!("\"{text}\" is not among possible values."));
    }
    Status::ok()
}

fn check_range(value: &BigDecimal, spec: &ValueSpec) -> Option<Status> {
    if let Some(min) = &spec.min {
        if value < min {
            return Some(Status::error(format!(
                "Value {value} is smaller than the minimum allowed value of {min}."
            )));
        }
    }
    if let Some(max) = &spec.max {
        if value > max {
            return Some(Status::error(format!(
                "Value {value} is larger than the maximum allowed value of {max}."
            )));
        }
    }
    None
}

/// Item count constraint of a list property
pub(crate) fn check_count(
    label: &str,
    count: usize,
    min: Option<usize>,
    max: Option<usize>,
) -> Status {
    if let Some(min) = min {
        if count < min {
            return Status::error(format!(
                "{} must have at least {min} item(s).",
                sentence(label)
            ));
        }
    }
    if let Some(max) = max {
        if count > max {
            return Status::error(format!(
                "{} must have at most {max} item(s).",
                sentence(label)
            ));
        }
    }
    Status::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    fn spec(value_type: ValueType) -> ValueSpec {
        ValueSpec {
            value_type,
            default: None,
            required: false,
            min: None,
            max: None,
            possible_values: Vec::new(),
            derived: None,
        }
    }

    #[test]
    fn test_required() {
        let mut s = spec(ValueType::String);
        s.required = true;
        assert_eq!(
            check_value("first name", &s, None).message,
            "First name must be specified."
        );
        assert!(check_value("first name", &s, Some("  ")).is_error());
        assert!(check_value("first name", &s, Some("Ada")).is_ok());
    }

    #[test]
    fn test_malformed_text() {
        let s = spec(ValueType::Integer);
        assert_eq!(
            check_value("age", &s, Some("abc")).message,
            "\"abc\" is not a valid integer."
        );
        let s = spec(ValueType::Decimal);
        assert_eq!(
            check_value("price", &s, Some("1.2.3")).message,
            "\"1.2.3\" is not a valid decimal number."
        );
    }

    #[test]
    fn test_range() {
        let mut s = spec(ValueType::Integer);
        s.min = Some(BigDecimal::from(0));
        s.max = Some(BigDecimal::from(150));
        assert_eq!(
            check_value("age", &s, Some("-1")).message,
            "Value -1 is smaller than the minimum allowed value of 0."
        );
        assert_eq!(
            check_value("age", &s, Some("200")).message,
            "Value 200 is larger than the maximum allowed value of 150."
        );
        assert!(check_value("age", &s, Some("42")).is_ok());
    }

    #[test]
    fn test_possible_values() {
        let mut s = spec(ValueType::String);
        s.possible_values = vec!["red".to_string(), "green".to_string()];
        assert_eq!(
            check_value("color", &s, Some("blue")).message,
            "\"blue\" is not among possible values."
        );
        assert!(check_value("color", &s, Some("red")).is_ok());
    }

    #[test]
    fn test_count() {
        assert_eq!(
            check_count("children", 0, Some(1), None).message,
            "Children must have at least 1 item(s)."
        );
        assert_eq!(
            check_count("children", 3, None, Some(2)).message,
            "Children must have at most 2 item(s)."
        );
        assert!(check_count("children", 2, Some(1), Some(2)).is_ok());
    }
}
