//! Runtime values for the evaluator

use super::numeric::Number;
use super::status::Status;
use crate::model::{Element, PropertyRef};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::fmt;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    /// Narrow integer, as held by integer-typed properties and variables
    Integer(i64),
    /// Integer literals and promoted integer arithmetic
    BigInteger(BigInt),
    Decimal(BigDecimal),
    String(String),
    List(Vec<Value>),
    Element(Element),
    /// Reference to a property; functions needing content unwrap it
    Property(PropertyRef),
    Status(Status),
}

impl Value {
    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::BigInteger(_) => "BigInteger",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Element(_) => "Element",
            Value::Property(_) => "Property",
            Value::Status(_) => "Status",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of a numeric value; no coercion
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Integer(n) => Some(Number::Integer(*n)),
            Value::BigInteger(n) => Some(Number::BigInteger(n.clone())),
            Value::Decimal(d) => Some(Number::Decimal(d.clone())),
            _ => None,
        }
    }

    /// String coercion: null is the empty string, lists join with ", ".
    /// Elements and unresolved properties have no text form.
    pub fn coerce_to_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(n) => Some(n.to_string()),
            Value::BigInteger(n) => Some(n.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(items) => {
                let parts: Option<Vec<String>> =
                    items.iter().map(Value::coerce_to_string).collect();
                parts.map(|p| p.join(", "))
            }
            Value::Status(s) => Some(s.message.clone()),
            Value::Element(_) | Value::Property(_) => None,
        }
    }

    /// Boolean coercion: null is false, strings are true only when they
    /// read "true" ignoring case
    pub fn coerce_to_bool(&self) -> Option<bool> {
        match self {
            Value::Null => Some(false),
            Value::Boolean(b) => Some(*b),
            Value::String(s) => Some(s.trim().eq_ignore_ascii_case("true")),
            _ => None,
        }
    }

    /// Null, empty string or empty list
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(n) => Value::Integer(n),
            Number::BigInteger(n) => Value::BigInteger(n),
            Number::Decimal(d) => Value::Decimal(d),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::BigInteger(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Element(e) => write!(f, "{e}"),
            Value::Property(p) => write!(f, "{p}"),
            Value::Status(s) => write!(f, "{s}"),
        }
    }
}

/// Structural equality; numbers of different kinds are different values,
/// elements compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Property(a), Value::Property(b)) => a == b,
            (Value::Status(a), Value::Status(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Integer(42)), "42");
        assert_eq!(format!("{}", Value::Boolean(true)), "true");
        assert_eq!(format!("{}", Value::Null), "null");
        assert_eq!(
            format!("{}", Value::List(vec![Value::from("a"), Value::Integer(1)])),
            "[a, 1]"
        );
    }

    #[test]
    fn test_number_kinds_are_distinct() {
        assert_ne!(Value::Integer(2), Value::BigInteger(BigInt::from(2)));
        assert_eq!(Value::from(Number::Integer(2)), Value::Integer(2));
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(Value::Null.coerce_to_string().as_deref(), Some(""));
        assert_eq!(Value::BigInteger(BigInt::from(7)).coerce_to_string().as_deref(), Some("7"));
        assert_eq!(
            Value::List(vec![Value::from("x"), Value::from("y")])
                .coerce_to_string()
                .as_deref(),
            Some("x, y")
        );
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(Value::from("TRUE").coerce_to_bool(), Some(true));
        assert_eq!(Value::from("yes").coerce_to_bool(), Some(false));
        assert_eq!(Value::Null.coerce_to_bool(), Some(false));
        assert_eq!(Value::Integer(1).coerce_to_bool(), None);
    }

    #[test]
    fn test_emptiness() {
        assert!(Value::Null.is_empty_value());
        assert!(Value::from("").is_empty_value());
        assert!(Value::List(Vec::new()).is_empty_value());
        assert!(!Value::Integer(0).is_empty_value());
    }
}
