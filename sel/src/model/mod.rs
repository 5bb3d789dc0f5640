//! Property model: element types, elements and their property services
//!
//! Elements hold value, list and element properties. Derived values,
//! enablement and validation rules are expressions evaluated through
//! cached function results owned by the element, so they recompute only
//! after something they read has changed.
//!
//! Service results may cache values referring back to their element. Call
//! `Element::dispose` on a tree that is no longer needed to release them.

mod context;
pub mod document;
mod element;
mod schema;
mod validation;

pub use context::ElementContext;
pub use element::{Element, PropertyRef};
pub use schema::{
    DependsOn, ElementType, ElementTypeBuilder, KindBuilder, PropertyBuilder, PropertyDef,
    PropertyKind, Rule, RuleBuilder, Schema, SchemaBuilder, ValueSpec, ValueType, default_label,
};

use crate::error::CompileError;
use crate::eval::FunctionError;
use thiserror::Error;

/// Rejected model operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Element type {0} is undefined.")]
    UnknownType(String),

    #[error("Property {property} is undefined for element type {element_type}.")]
    UnknownProperty {
        property: String,
        element_type: String,
    },

    #[error("Property {property} is not a {expected} property.")]
    WrongKind {
        property: String,
        expected: &'static str,
    },

    #[error("Property {0} is derived and cannot be written.")]
    ReadOnly(String),

    #[error("Element is not an item of property {0}.")]
    NotAnItem(String),

    #[error("Element has been disposed.")]
    Disposed,

    /// A derived value failed to compute
    #[error("{0}")]
    Evaluation(String),

    /// Malformed instance document
    #[error("{0}")]
    Document(String),
}

impl From<ModelError> for FunctionError {
    fn from(e: ModelError) -> Self {
        FunctionError::model(e.to_string())
    }
}

impl From<ModelError> for CompileError {
    fn from(e: ModelError) -> Self {
        CompileError::model(e.to_string())
    }
}
