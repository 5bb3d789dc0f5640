//! Expression evaluation
//!
//! A template compiles once into a `Function` tree. Evaluating the tree
//! against a `FunctionContext` yields a `FunctionResult` tree that computes
//! lazily, caches its outcome and invalidates itself when anything it read
//! changes.

pub mod context;
pub mod error;
pub mod function;
pub mod functions;
pub mod numeric;
pub mod registry;
pub mod result;
pub mod status;
pub mod value;

pub use context::{ContextRef, FunctionContext, MapContext, Tracker};
pub use error::{ErrorKind, FunctionError, FunctionOutcome};
pub use function::{Engine, Function, FunctionKind};
pub use functions::{Builtin, BuiltinFn};
pub use numeric::Number;
pub use registry::{Arity, Call, FunctionRegistry, Implementation, Runtime};
pub use result::{FunctionResult, Outcome};
pub use status::{Severity, Status};
pub use value::Value;
