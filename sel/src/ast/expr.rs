//! Expression AST nodes

use super::Spanned;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Literal),

    /// Bare identifier, resolved by the function context
    Ident(String),

    /// Member access: target.name
    Member {
        target: Box<Spanned<Expr>>,
        name: Spanned<String>,
    },

    /// Function call: Name(args)
    Call {
        func: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// Method-style call: target.Name(args), sugar for Name(target, args)
    MethodCall {
        target: Box<Spanned<Expr>>,
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// Indexing: target[index]
    Index {
        target: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Conditional: cond ? then : otherwise
    Conditional {
        cond: Box<Spanned<Expr>>,
        then: Box<Spanned<Expr>>,
        otherwise: Box<Spanned<Expr>>,
    },

    /// Literal text interleaved with `${ }` blocks, concatenated as strings
    Composite(Vec<Spanned<Expr>>),
}

/// Literal values as written in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    String(String),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl BinOp {
    /// Name of the built-in function implementing this operator
    pub fn function_name(self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Subtract",
            BinOp::Mul => "Multiply",
            BinOp::Div => "Divide",
            BinOp::Mod => "Modulo",
            BinOp::Eq => "Equal",
            BinOp::Ne => "NotEqual",
            BinOp::Lt => "LessThan",
            BinOp::Gt => "GreaterThan",
            BinOp::Le => "LessThanOrEqual",
            BinOp::Ge => "GreaterThanOrEqual",
            BinOp::And => "And",
            BinOp::Or => "Or",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not (! or not)
    Not,
    /// Emptiness test (empty)
    Empty,
}

impl UnOp {
    pub fn function_name(self) -> &'static str {
        match self {
            UnOp::Neg => "Negative",
            UnOp::Not => "Not",
            UnOp::Empty => "Empty",
        }
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
            UnOp::Empty => write!(f, "empty"),
        }
    }
}
