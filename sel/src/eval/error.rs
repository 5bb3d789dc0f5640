//! Failures raised while computing a function result

use std::fmt;

/// Failure of one function evaluation. It never escapes evaluation: the
/// result turns it into an error status.
#[derive(Debug, Clone)]
pub struct FunctionError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of evaluation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Null supplied where the function needs a value
    NullOperand,
    /// No implementation for the operand types
    Undefined,
    /// Operand count mismatch on a method-style call
    ArityMismatch,
    /// Division or modulo by zero
    DivisionByZero,
    /// String could not be read as a number
    Conversion,
    /// Index out of bounds
    IndexOutOfBounds,
    /// Identifier is not a property of the context element
    UndefinedProperty,
    /// Identifier is not a host variable
    UndefinedVariable,
    /// An expression depends on its own value
    Cycle,
    /// Result or context was disposed
    Disposed,
    /// Invalid regular expression
    InvalidPattern,
    /// An operand failed; its message is carried over
    Operand,
    /// Model rejected the operation
    Model,
}

impl FunctionError {
    fn new(kind: ErrorKind, message: String) -> Self {
        FunctionError { kind, message }
    }

    pub fn null_operand(function: &str, position: usize) -> Self {
        Self::new(
            ErrorKind::NullOperand,
            format!("Function {function} does not accept nulls in position {position}."),
        )
    }

    /// `Function X( T1, T2 ) is undefined.`
    pub fn undefined(function: &str, types: &[&str]) -> Self {
        let message = if types.is_empty() {
            format!("Function {function}() is undefined.")
        } else {
            format!("Function {function}( {} ) is undefined.", types.join(", "))
        };
        Self::new(ErrorKind::Undefined, message)
    }

    pub fn arity_mismatch(function: &str, expected: &str, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("Function {function} expects {expected} operand(s), got {got}."),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "Division by zero.".to_string())
    }

    pub fn conversion(text: &str) -> Self {
        Self::new(
            ErrorKind::Conversion,
            format!("Cannot convert \"{text}\" to a number."),
        )
    }

    pub fn index_out_of_bounds(index: &str, size: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("Index {index} is out of bounds for size {size}."),
        )
    }

    pub fn undefined_property(name: &str, element_type: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedProperty,
            format!("Property {name} is undefined for element type {element_type}."),
        )
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("Variable {name} is undefined."),
        )
    }

    pub fn cycle(what: &str) -> Self {
        Self::new(
            ErrorKind::Cycle,
            format!("Cyclic dependency detected while evaluating {what}."),
        )
    }

    pub fn disposed() -> Self {
        Self::new(
            ErrorKind::Disposed,
            "Function result has been disposed.".to_string(),
        )
    }

    pub fn invalid_pattern(detail: &str) -> Self {
        Self::new(
            ErrorKind::InvalidPattern,
            format!("Invalid regular expression: {detail}"),
        )
    }

    /// Carry an operand's failure up unchanged
    pub fn operand(message: &str) -> Self {
        Self::new(ErrorKind::Operand, message.to_string())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Model, message.into())
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FunctionError {}

/// Result type for function evaluation
pub type FunctionOutcome<T> = Result<T, FunctionError>;
