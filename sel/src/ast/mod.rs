//! Abstract Syntax Tree definitions

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};

/// A parsed template: the source it came from and its root expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub source: String,
    pub root: Spanned<Expr>,
}

impl Template {
    /// True when the template evaluates to a constant string
    pub fn is_literal(&self) -> bool {
        matches!(self.root.node, Expr::Literal(Literal::String(_)))
    }
}
