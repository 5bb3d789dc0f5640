//! Compiled functions and the engine that lowers templates into them

use super::context::{ContextRef, Tracker};
use super::error::{FunctionError, FunctionOutcome};
use super::registry::{Call, FunctionRegistry, Implementation, Runtime};
use super::result::FunctionResult;
use super::value::Value;
use crate::ast::{Expr, Literal, Span, Spanned};
use crate::config::EvalConfig;
use crate::error::{CompileError, Result};
use crate::model::PropertyRef;
use crate::parser::{parse_expression, parse_template};
use std::fmt;
use std::rc::Rc;

/// Stack growth parameters for deeply nested expressions
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// What a function node does
#[derive(Clone)]
pub enum FunctionKind {
    Literal(Value),
    /// Bare identifier, resolved by the context
    Identifier(String),
    /// `target.name`: a property of an element, else a one-operand function
    Member(String),
    /// Built-in applied to the node's operands
    Call(Rc<dyn Implementation>),
}

/// Node of a compiled expression. Immutable and shareable; evaluating it
/// against a context yields a `FunctionResult` tree of the same shape.
#[derive(Clone)]
pub struct Function {
    kind: FunctionKind,
    operands: Vec<Rc<Function>>,
    span: Span,
    runtime: Rc<Runtime>,
    /// Root of a compiled template: a property value is replaced by its
    /// content
    top: bool,
}

impl Function {
    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    pub fn operands(&self) -> &[Rc<Function>] {
        &self.operands
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Short name for diagnostics
    pub fn name(&self) -> String {
        match &self.kind {
            FunctionKind::Literal(value) => format!("literal {value}"),
            FunctionKind::Identifier(name) => name.clone(),
            FunctionKind::Member(name) => format!(".{name}"),
            FunctionKind::Call(implementation) => implementation.name().to_string(),
        }
    }

    /// Build the result tree for a context. Nothing is computed until a
    /// value is read.
    pub fn evaluate(self: &Rc<Self>, context: &ContextRef) -> FunctionResult {
        FunctionResult::new(Rc::clone(self), context)
    }

    pub(crate) fn compute(
        &self,
        operands: &[FunctionResult],
        context: &ContextRef,
        tracker: &mut Tracker,
    ) -> FunctionOutcome<Value> {
        let value = self.compute_raw(operands, context, tracker)?;
        match value {
            Value::Property(property) if self.top => property.content(tracker),
            other => Ok(other),
        }
    }

    fn compute_raw(
        &self,
        operands: &[FunctionResult],
        context: &ContextRef,
        tracker: &mut Tracker,
    ) -> FunctionOutcome<Value> {
        match &self.kind {
            FunctionKind::Literal(value) => Ok(value.clone()),
            FunctionKind::Identifier(name) => context.resolve(name, tracker),
            FunctionKind::Member(name) => self.member(name, operands, context, tracker),
            FunctionKind::Call(implementation) => {
                let mut call = Call::new(
                    implementation.name(),
                    operands,
                    context,
                    &self.runtime,
                    tracker,
                );
                implementation.evaluate(&mut call)
            }
        }
    }

    fn member(
        &self,
        name: &str,
        operands: &[FunctionResult],
        context: &ContextRef,
        tracker: &mut Tracker,
    ) -> FunctionOutcome<Value> {
        let runtime = &*self.runtime;
        let mut call = Call::new("PropertyAccess", operands, context, runtime, tracker);
        let raw = call.operand(0)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let content = call.content_of(raw)?;
        if let Value::Element(element) = &content {
            if element.element_type().has_property(name) {
                return Ok(Value::Property(PropertyRef::new(element.clone(), name)));
            }
        }
        if let Some(implementation) = runtime.registry.get(name) {
            if !implementation.arity().accepts(1) {
                return Err(FunctionError::arity_mismatch(
                    implementation.name(),
                    &implementation.arity().to_string(),
                    1,
                ));
            }
            let mut dispatch = Call::new(
                implementation.name(),
                operands,
                context,
                runtime,
                call.tracker(),
            );
            return implementation.evaluate(&mut dispatch);
        }
        match content {
            Value::Null => Ok(Value::Null),
            Value::Element(element) => Err(FunctionError::undefined_property(
                name,
                element.element_type().name(),
            )),
            other => Err(FunctionError::undefined(name, &[other.type_name()])),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("span", &self.span)
            .field("operands", &self.operands)
            .finish()
    }
}

/// Compiles templates against one registry and configuration
#[derive(Debug, Clone)]
pub struct Engine {
    runtime: Rc<Runtime>,
}

impl Engine {
    /// Engine with the standard library and default settings
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Self::with_registry(FunctionRegistry::standard(), config)
    }

    pub fn with_registry(registry: FunctionRegistry, config: EvalConfig) -> Self {
        Engine {
            runtime: Rc::new(Runtime { registry, config }),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.runtime.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.runtime.registry
    }

    /// Compile a template (`text ${ expr } text`)
    pub fn compile(&self, source: &str) -> Result<Rc<Function>> {
        let template = parse_template(source)?;
        Ok(top(self.lower(&template.root)?))
    }

    /// Compile a bare expression, without `${ }`
    pub fn compile_expression(&self, source: &str) -> Result<Rc<Function>> {
        let expr = parse_expression(source)?;
        Ok(top(self.lower(&expr)?))
    }

    /// Compile and evaluate in one step
    pub fn evaluate(&self, source: &str, context: &ContextRef) -> Result<FunctionResult> {
        Ok(self.compile(source)?.evaluate(context))
    }

    /// Lower an expression into a function tree
    pub fn lower(&self, expr: &Spanned<Expr>) -> Result<Rc<Function>> {
        self.lower_at(expr, 0)
    }

    fn lower_at(&self, expr: &Spanned<Expr>, depth: usize) -> Result<Rc<Function>> {
        let limit = self.runtime.config.max_depth;
        if depth > limit {
            return Err(CompileError::resolve(
                format!("Expression nesting exceeds the limit of {limit}."),
                expr.span,
            ));
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.lower_inner(expr, depth + 1)
        })
    }

    fn lower_inner(&self, expr: &Spanned<Expr>, depth: usize) -> Result<Rc<Function>> {
        let span = expr.span;
        match &expr.node {
            Expr::Literal(literal) => {
                let value = match literal {
                    Literal::Null => Value::Null,
                    Literal::Bool(b) => Value::Boolean(*b),
                    Literal::Integer(n) => Value::BigInteger(n.clone()),
                    Literal::Decimal(d) => Value::Decimal(d.clone()),
                    Literal::String(s) => Value::String(s.clone()),
                };
                Ok(self.node(FunctionKind::Literal(value), Vec::new(), span))
            }
            Expr::Ident(name) if name == "This" => self.call("This", &[], span, span, depth),
            Expr::Ident(name) => Ok(self.node(
                FunctionKind::Identifier(name.clone()),
                Vec::new(),
                span,
            )),
            Expr::Member { target, name } => {
                let target = self.lower_at(target, depth)?;
                Ok(self.node(FunctionKind::Member(name.node.clone()), vec![target], span))
            }
            Expr::Call { func, args } => {
                let args: Vec<&Spanned<Expr>> = args.iter().collect();
                self.call(&func.node, &args, func.span, span, depth)
            }
            Expr::MethodCall { target, name, args } => {
                let mut operands: Vec<&Spanned<Expr>> = Vec::with_capacity(args.len() + 1);
                operands.push(&**target);
                operands.extend(args.iter());
                self.call(&name.node, &operands, name.span, span, depth)
            }
            Expr::Index { target, index } => {
                self.call("Index", &[&**target, &**index], span, span, depth)
            }
            Expr::Binary { left, op, right } => {
                self.call(op.function_name(), &[&**left, &**right], span, span, depth)
            }
            Expr::Unary { op, expr: operand } => {
                self.call(op.function_name(), &[&**operand], span, span, depth)
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => self.call("Condition", &[&**cond, &**then, &**otherwise], span, span, depth),
            Expr::Composite(parts) => {
                let parts: Vec<&Spanned<Expr>> = parts.iter().collect();
                self.call("Concat", &parts, span, span, depth)
            }
        }
    }

    fn call(
        &self,
        name: &str,
        args: &[&Spanned<Expr>],
        name_span: Span,
        span: Span,
        depth: usize,
    ) -> Result<Rc<Function>> {
        let implementation = self.runtime.registry.get(name).ok_or_else(|| {
            CompileError::resolve(format!("Function {name} is undefined."), name_span)
        })?;
        let arity = implementation.arity();
        if !arity.accepts(args.len()) {
            return Err(CompileError::resolve(
                format!(
                    "Function {name} expects {arity} operand(s), got {}.",
                    args.len()
                ),
                span,
            ));
        }
        let operands = args
            .iter()
            .map(|arg| self.lower_at(arg, depth))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.node(FunctionKind::Call(implementation), operands, span))
    }

    fn node(&self, kind: FunctionKind, operands: Vec<Rc<Function>>, span: Span) -> Rc<Function> {
        Rc::new(Function {
            kind,
            operands,
            span,
            runtime: Rc::clone(&self.runtime),
            top: false,
        })
    }
}

fn top(function: Rc<Function>) -> Rc<Function> {
    let mut function = Rc::unwrap_or_clone(function);
    function.top = true;
    Rc::new(function)
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_function_is_resolve_error() {
        let err = Engine::new().compile("${ Frobnicate(1) }").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
        assert_eq!(err.message(), "Function Frobnicate is undefined.");
        assert_eq!(err.span(), Some(Span::new(3, 13)));
    }

    #[test]
    fn test_wrong_arity_is_resolve_error() {
        let err = Engine::new().compile("${ Size() }").unwrap_err();
        assert_eq!(err.message(), "Function Size expects 1 operand(s), got 0.");
    }

    #[test]
    fn test_method_call_counts_target() {
        assert!(Engine::new().compile("${ Name.StartsWith('a') }").is_ok());
        assert!(Engine::new().compile("${ Name.StartsWith() }").is_err());
    }

    #[test]
    fn test_operator_lowers_to_named_function() {
        let function = Engine::new().compile("${ 1 + 2 }").unwrap();
        assert_eq!(function.name(), "Add");
        assert_eq!(function.operands().len(), 2);
    }

    #[test]
    fn test_this_lowers_to_function() {
        let function = Engine::new().compile("${ This }").unwrap();
        assert_eq!(function.name(), "This");
    }

    #[test]
    fn test_composite_lowers_to_concat() {
        let function = Engine::new().compile("a${ 1 }b").unwrap();
        assert_eq!(function.name(), "Concat");
        assert_eq!(function.operands().len(), 3);
    }

    #[test]
    fn test_nesting_limit() {
        let config = EvalConfig {
            max_depth: 4,
            ..EvalConfig::default()
        };
        let engine = Engine::with_config(config);
        assert!(engine.compile("${ 1 + 2 }").is_ok());
        let err = engine.compile("${ -(-(-(-(-1)))) }").unwrap_err();
        assert_eq!(err.message(), "Expression nesting exceeds the limit of 4.");
    }

    #[test]
    fn test_deep_nesting_compiles() {
        let source = format!("${{ {}1{} }}", "(".repeat(500), ")".repeat(500));
        assert!(Engine::new().compile(&source).is_ok());
    }
}
