//! Function registry and the calling convention built-ins implement

use super::context::{ContextRef, Tracker};
use super::error::{FunctionError, FunctionOutcome};
use super::functions;
use super::result::FunctionResult;
use super::value::Value;
use crate::config::EvalConfig;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Accepted operand counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Arity {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Arity { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// A built-in function
pub trait Implementation {
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Compute the value from the call's operands. Operands are computed
    /// lazily, so an implementation only pays for the ones it reads.
    fn evaluate(&self, call: &mut Call<'_>) -> FunctionOutcome<Value>;
}

/// Operand access for one computation of a function result
pub struct Call<'a> {
    name: &'static str,
    operands: &'a [FunctionResult],
    context: &'a ContextRef,
    runtime: &'a Runtime,
    tracker: &'a mut Tracker,
}

impl<'a> Call<'a> {
    pub(crate) fn new(
        name: &'static str,
        operands: &'a [FunctionResult],
        context: &'a ContextRef,
        runtime: &'a Runtime,
        tracker: &'a mut Tracker,
    ) -> Self {
        Call {
            name,
            operands,
            context,
            runtime,
            tracker,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Raw value of an operand; a failed operand fails the call with the
    /// operand's message
    pub fn operand(&self, position: usize) -> FunctionOutcome<Value> {
        let operand = self.operands.get(position).ok_or_else(|| {
            FunctionError::arity_mismatch(
                self.name,
                &(position + 1).to_string(),
                self.operands.len(),
            )
        })?;
        let outcome = operand.outcome();
        if outcome.status.is_error() {
            return Err(FunctionError::operand(&outcome.status.message));
        }
        Ok(outcome.value.clone())
    }

    /// Operand with properties replaced by their content
    pub fn content(&mut self, position: usize) -> FunctionOutcome<Value> {
        let value = self.operand(position)?;
        self.content_of(value)
    }

    /// Content that must not be null
    pub fn non_null(&mut self, position: usize) -> FunctionOutcome<Value> {
        let value = self.content(position)?;
        if value.is_null() {
            return Err(FunctionError::null_operand(self.name, position));
        }
        Ok(value)
    }

    /// Replace a property reference by its content
    pub fn content_of(&mut self, value: Value) -> FunctionOutcome<Value> {
        match value {
            Value::Property(property) => property.content(&mut *self.tracker),
            other => Ok(other),
        }
    }

    /// `Function X( types ) is undefined.` for the given operands
    pub fn undefined(&self, values: &[&Value]) -> FunctionError {
        let types: Vec<&str> = values.iter().map(|v| v.type_name()).collect();
        FunctionError::undefined(self.name, &types)
    }

    pub fn context(&self) -> &ContextRef {
        self.context
    }

    pub fn tracker(&mut self) -> &mut Tracker {
        &mut *self.tracker
    }

    pub fn config(&self) -> &EvalConfig {
        &self.runtime.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.runtime.registry
    }
}

/// Functions by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Rc<dyn Implementation>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in operator and function
    pub fn standard() -> Self {
        let mut registry = Self::new();
        functions::register_all(&mut registry);
        registry
    }

    /// Add or replace a function
    pub fn register(&mut self, implementation: Rc<dyn Implementation>) {
        self.functions
            .insert(implementation.name().to_string(), implementation);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Implementation>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// What every compiled function node shares: the registry for member
/// dispatch and the evaluation settings
#[derive(Debug, Default)]
pub struct Runtime {
    pub registry: FunctionRegistry,
    pub config: EvalConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::exactly(1).accepts(1));
        assert!(!Arity::exactly(1).accepts(2));
        assert!(Arity::range(0, 1).accepts(0));
        assert!(Arity::at_least(1).accepts(7));
        assert!(!Arity::at_least(1).accepts(0));
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::exactly(2).to_string(), "2");
        assert_eq!(Arity::range(0, 1).to_string(), "0..1");
        assert_eq!(Arity::at_least(0).to_string(), "at least 0");
    }

    #[test]
    fn test_standard_registry_has_navigation_functions() {
        let registry = FunctionRegistry::standard();
        for name in ["Parent", "Root", "This", "Content", "Size", "Tail", "Validation", "Enabled"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.contains("Modulo"));
    }
}
