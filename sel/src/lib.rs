//! SEL Expression Language Library
//!
//! `${ }` templates compiled into function trees whose results are computed
//! lazily, cached, and invalidated when anything they read changes.

pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod model;
pub mod observe;
pub mod parser;
pub mod repl;

pub use ast::Span;
pub use config::EvalConfig;
pub use error::{CompileError, Result};
pub use eval::{
    ContextRef, Engine, FunctionContext, FunctionResult, MapContext, Severity, Status, Value,
};
pub use model::{Element, Schema, SchemaBuilder};
