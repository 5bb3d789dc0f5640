//! Element types and the builders that declare them
//!
//! Builders are plain data (and deserialize from schema documents).
//! `SchemaBuilder::build` checks references between types and compiles
//! every expression up front, so a built schema never fails to evaluate
//! for syntactic reasons.

use super::element::Element;
use super::ModelError;
use crate::error::{CompileError, Result};
use crate::eval::{Engine, Function, Severity, Value};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

/// Type of a value property's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Decimal,
    Boolean,
}

impl ValueType {
    /// Wording used in "is not a valid ..." messages
    pub fn describe(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal number",
            ValueType::Boolean => "boolean",
        }
    }

    /// Typed reading of property text; `None` when malformed. Integers
    /// read narrow, widening only past `i64`.
    pub fn parse(&self, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        match self {
            ValueType::String => Some(Value::String(text.to_string())),
            ValueType::Integer => match trimmed.parse::<i64>() {
                Ok(n) => Some(Value::Integer(n)),
                Err(_) => BigInt::from_str(trimmed).ok().map(Value::BigInteger),
            },
            ValueType::Decimal => BigDecimal::from_str(trimmed).ok().map(Value::Decimal),
            ValueType::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Value::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Value::Boolean(false))
                } else {
                    None
                }
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Decimal)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

fn default_severity() -> Severity {
    Severity::Error
}

/// Validation rule: an expression that must hold
#[derive(Debug, Clone, Deserialize)]
pub struct RuleBuilder {
    pub expression: String,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KindBuilder {
    Value {
        #[serde(rename = "type", default)]
        value_type: ValueType,
        #[serde(default)]
        default: Option<String>,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        min: Option<BigDecimal>,
        #[serde(default)]
        max: Option<BigDecimal>,
        #[serde(default)]
        possible_values: Vec<String>,
        #[serde(default)]
        derived: Option<String>,
    },
    List {
        element_type: String,
        #[serde(default)]
        min_count: Option<usize>,
        #[serde(default)]
        max_count: Option<usize>,
    },
    Element {
        element_type: String,
    },
}

/// Declaration of one property
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyBuilder {
    pub name: String,
    #[serde(flatten)]
    pub kind: KindBuilder,
    #[serde(default)]
    pub label: Option<String>,
    /// Enablement expression
    #[serde(default)]
    pub enabled: Option<String>,
    /// Properties whose changes refresh this one: `Name` for a sibling,
    /// `../Name` for a property of the parent element
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleBuilder>,
}

impl PropertyBuilder {
    fn new(name: &str, kind: KindBuilder) -> Self {
        PropertyBuilder {
            name: name.to_string(),
            kind,
            label: None,
            enabled: None,
            depends_on: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn value(name: &str, value_type: ValueType) -> Self {
        Self::new(
            name,
            KindBuilder::Value {
                value_type,
                default: None,
                required: false,
                min: None,
                max: None,
                possible_values: Vec::new(),
                derived: None,
            },
        )
    }

    pub fn list(name: &str, element_type: &str) -> Self {
        Self::new(
            name,
            KindBuilder::List {
                element_type: element_type.to_string(),
                min_count: None,
                max_count: None,
            },
        )
    }

    pub fn element(name: &str, element_type: &str) -> Self {
        Self::new(
            name,
            KindBuilder::Element {
                element_type: element_type.to_string(),
            },
        )
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn enabled(mut self, expression: &str) -> Self {
        self.enabled = Some(expression.to_string());
        self
    }

    pub fn depends_on(mut self, path: &str) -> Self {
        self.depends_on.push(path.to_string());
        self
    }

    pub fn rule(self, expression: &str, message: &str) -> Self {
        self.rule_with(expression, message, Severity::Error)
    }

    pub fn rule_with(mut self, expression: &str, message: &str, severity: Severity) -> Self {
        self.rules.push(RuleBuilder {
            expression: expression.to_string(),
            message: message.to_string(),
            severity,
        });
        self
    }

    // Value property settings; no effect on list and element properties

    pub fn default_text(mut self, text: &str) -> Self {
        if let KindBuilder::Value { default, .. } = &mut self.kind {
            *default = Some(text.to_string());
        }
        self
    }

    pub fn required(mut self) -> Self {
        if let KindBuilder::Value { required, .. } = &mut self.kind {
            *required = true;
        }
        self
    }

    pub fn min(mut self, value: impl Into<BigDecimal>) -> Self {
        if let KindBuilder::Value { min, .. } = &mut self.kind {
            *min = Some(value.into());
        }
        self
    }

    pub fn max(mut self, value: impl Into<BigDecimal>) -> Self {
        if let KindBuilder::Value { max, .. } = &mut self.kind {
            *max = Some(value.into());
        }
        self
    }

    pub fn possible_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let KindBuilder::Value {
            possible_values, ..
        } = &mut self.kind
        {
            possible_values.extend(values.into_iter().map(Into::into));
        }
        self
    }

    pub fn derived(mut self, expression: &str) -> Self {
        if let KindBuilder::Value { derived, .. } = &mut self.kind {
            *derived = Some(expression.to_string());
        }
        self
    }

    /// Item count constraint of a list property
    pub fn count(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        if let KindBuilder::List {
            min_count,
            max_count,
            ..
        } = &mut self.kind
        {
            *min_count = min;
            *max_count = max;
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementTypeBuilder {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyBuilder>,
}

impl ElementTypeBuilder {
    pub fn new(name: &str) -> Self {
        ElementTypeBuilder {
            name: name.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: PropertyBuilder) -> Self {
        self.properties.push(property);
        self
    }
}

/// Compiled settings of a value property
#[derive(Debug)]
pub struct ValueSpec {
    pub value_type: ValueType,
    pub default: Option<String>,
    pub required: bool,
    pub min: Option<BigDecimal>,
    pub max: Option<BigDecimal>,
    pub possible_values: Vec<String>,
    pub derived: Option<Rc<Function>>,
}

#[derive(Debug)]
pub enum PropertyKind {
    Value(ValueSpec),
    List {
        element_type: String,
        min_count: Option<usize>,
        max_count: Option<usize>,
    },
    Element {
        element_type: String,
    },
}

#[derive(Debug)]
pub struct Rule {
    pub function: Rc<Function>,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependsOn {
    Sibling(String),
    Parent(String),
}

impl DependsOn {
    fn parse(path: &str) -> Self {
        match path.strip_prefix("../") {
            Some(name) => DependsOn::Parent(name.to_string()),
            None => DependsOn::Sibling(path.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct PropertyDef {
    pub name: String,
    pub label: String,
    pub kind: PropertyKind,
    pub enablement: Option<Rc<Function>>,
    pub rules: Vec<Rule>,
    pub depends_on: Vec<DependsOn>,
}

impl PropertyDef {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            PropertyKind::Value(_) => "value",
            PropertyKind::List { .. } => "list",
            PropertyKind::Element { .. } => "element",
        }
    }

    pub fn value_spec(&self) -> Option<&ValueSpec> {
        match &self.kind {
            PropertyKind::Value(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.value_spec().is_some_and(|spec| spec.derived.is_some())
    }

    /// Element type of list items or of the held element
    pub fn child_type(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::List { element_type, .. } | PropertyKind::Element { element_type } => {
                Some(element_type)
            }
            PropertyKind::Value(_) => None,
        }
    }

    pub(crate) fn depends_on_sibling(&self, name: &str) -> bool {
        self.depends_on
            .iter()
            .any(|d| matches!(d, DependsOn::Sibling(n) if n == name))
    }

    pub(crate) fn depends_on_parent(&self, name: &str) -> bool {
        self.depends_on
            .iter()
            .any(|d| matches!(d, DependsOn::Parent(n) if n == name))
    }
}

#[derive(Debug)]
pub struct ElementType {
    name: String,
    properties: Vec<PropertyDef>,
    index: HashMap<String, usize>,
}

impl ElementType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order
    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// Set of element types compiled against one engine
#[derive(Debug)]
pub struct Schema {
    engine: Engine,
    types: HashMap<String, Rc<ElementType>>,
    next_id: Cell<u64>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn element_type(&self, name: &str) -> Option<Rc<ElementType>> {
        self.types.get(name).cloned()
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// New root element of the named type
    pub fn instantiate(
        self: &Rc<Self>,
        type_name: &str,
    ) -> std::result::Result<Element, ModelError> {
        let element_type = self
            .element_type(type_name)
            .ok_or_else(|| ModelError::UnknownType(type_name.to_string()))?;
        Ok(Element::new(Rc::clone(self), element_type, None))
    }

    pub(crate) fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

pub struct SchemaBuilder {
    engine: Engine,
    types: Vec<ElementTypeBuilder>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    pub fn with_engine(engine: Engine) -> Self {
        SchemaBuilder {
            engine,
            types: Vec::new(),
        }
    }

    pub fn element_type(mut self, element_type: ElementTypeBuilder) -> Self {
        self.types.push(element_type);
        self
    }

    pub fn build(self) -> Result<Rc<Schema>> {
        let mut declared = HashSet::new();
        for builder in &self.types {
            if !declared.insert(builder.name.as_str()) {
                return Err(CompileError::model(format!(
                    "Element type {} is declared twice.",
                    builder.name
                )));
            }
        }

        let mut types = HashMap::new();
        for builder in &self.types {
            let element_type = self.build_type(builder, &declared)?;
            debug!(
                element_type = %element_type.name,
                properties = element_type.properties.len(),
                "built element type"
            );
            types.insert(builder.name.clone(), Rc::new(element_type));
        }
        Ok(Rc::new(Schema {
            engine: self.engine,
            types,
            next_id: Cell::new(1),
        }))
    }

    fn build_type(
        &self,
        builder: &ElementTypeBuilder,
        declared: &HashSet<&str>,
    ) -> Result<ElementType> {
        let mut properties = Vec::with_capacity(builder.properties.len());
        let mut index = HashMap::new();
        for property in &builder.properties {
            if index.insert(property.name.clone(), properties.len()).is_some() {
                return Err(CompileError::model(format!(
                    "Property {} is declared twice in element type {}.",
                    property.name, builder.name
                )));
            }
            properties.push(self.build_property(property, declared)?);
        }

        for property in &properties {
            for dependency in &property.depends_on {
                if let DependsOn::Sibling(name) = dependency {
                    if !index.contains_key(name) {
                        return Err(CompileError::model(format!(
                            "Property {} depends on undefined property {name}.",
                            property.name
                        )));
                    }
                }
            }
        }

        Ok(ElementType {
            name: builder.name.clone(),
            properties,
            index,
        })
    }

    fn build_property(
        &self,
        builder: &PropertyBuilder,
        declared: &HashSet<&str>,
    ) -> Result<PropertyDef> {
        let kind = match &builder.kind {
            KindBuilder::Value {
                value_type,
                default,
                required,
                min,
                max,
                possible_values,
                derived,
            } => PropertyKind::Value(ValueSpec {
                value_type: *value_type,
                default: default.clone(),
                required: *required,
                min: min.clone(),
                max: max.clone(),
                possible_values: possible_values.clone(),
                derived: self.compile(derived.as_deref())?,
            }),
            KindBuilder::List {
                element_type,
                min_count,
                max_count,
            } => {
                check_type(element_type, declared)?;
                PropertyKind::List {
                    element_type: element_type.clone(),
                    min_count: *min_count,
                    max_count: *max_count,
                }
            }
            KindBuilder::Element { element_type } => {
                check_type(element_type, declared)?;
                PropertyKind::Element {
                    element_type: element_type.clone(),
                }
            }
        };

        let rules = builder
            .rules
            .iter()
            .map(|rule| {
                Ok(Rule {
                    function: self.engine.compile(&rule.expression)?,
                    message: rule.message.clone(),
                    severity: rule.severity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PropertyDef {
            name: builder.name.clone(),
            label: builder
                .label
                .clone()
                .unwrap_or_else(|| default_label(&builder.name)),
            kind,
            enablement: self.compile(builder.enabled.as_deref())?,
            rules,
            depends_on: builder.depends_on.iter().map(|p| DependsOn::parse(p)).collect(),
        })
    }

    fn compile(&self, expression: Option<&str>) -> Result<Option<Rc<Function>>> {
        expression.map(|e| self.engine.compile(e)).transpose()
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_type(name: &str, declared: &HashSet<&str>) -> Result<()> {
    if declared.contains(name) {
        Ok(())
    } else {
        Err(ModelError::UnknownType(name.to_string()).into())
    }
}

/// Label derived from a camel case property name: `FirstName` reads
/// "first name", `HTTPPort` reads "http port"
pub fn default_label(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut label = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary =
                prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower);
            if boundary {
                label.push(' ');
            }
        }
        label.extend(c.to_lowercase());
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label() {
        assert_eq!(default_label("FirstName"), "first name");
        assert_eq!(default_label("Name"), "name");
        assert_eq!(default_label("HTTPPort"), "http port");
        assert_eq!(default_label("Line2Text"), "line2 text");
    }

    #[test]
    fn test_value_type_parse() {
        assert_eq!(ValueType::Integer.parse(" 42 "), Some(Value::Integer(42)));
        assert!(matches!(
            ValueType::Integer.parse("99999999999999999999"),
            Some(Value::BigInteger(_))
        ));
        assert_eq!(ValueType::Integer.parse("4.2"), None);
        assert_eq!(ValueType::Boolean.parse("TRUE"), Some(Value::Boolean(true)));
        assert_eq!(ValueType::Boolean.parse("yes"), None);
    }

    #[test]
    fn test_build_rejects_unknown_child_type() {
        let err = Schema::builder()
            .element_type(
                ElementTypeBuilder::new("Person").property(PropertyBuilder::list("Pets", "Pet")),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.message(), "Element type Pet is undefined.");
    }

    #[test]
    fn test_build_rejects_unknown_dependency() {
        let err = Schema::builder()
            .element_type(ElementTypeBuilder::new("Person").property(
                PropertyBuilder::value("Name", ValueType::String).depends_on("Nickname"),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err.message(), "Property Name depends on undefined property Nickname.");
    }

    #[test]
    fn test_build_reports_expression_errors() {
        let err = Schema::builder()
            .element_type(ElementTypeBuilder::new("Person").property(
                PropertyBuilder::value("Name", ValueType::String).enabled("${ Bogus(1) }"),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn test_built_type_lookup() {
        let schema = Schema::builder()
            .element_type(
                ElementTypeBuilder::new("Person")
                    .property(PropertyBuilder::value("FirstName", ValueType::String).required())
                    .property(PropertyBuilder::value("Age", ValueType::Integer).min(0).max(150)),
            )
            .build()
            .unwrap();
        let person = schema.element_type("Person").unwrap();
        assert!(person.has_property("Age"));
        assert_eq!(person.property("FirstName").unwrap().label, "first name");
        assert_eq!(person.properties()[1].kind_name(), "value");
        assert_eq!(schema.type_names(), vec!["Person"]);
    }

    #[test]
    fn test_property_builder_deserializes() {
        let json = r#"{ "name": "Age", "kind": "value", "type": "integer", "min": 0, "required": true }"#;
        let property: PropertyBuilder = serde_json::from_str(json).unwrap();
        match property.kind {
            KindBuilder::Value {
                value_type,
                required,
                min,
                ..
            } => {
                assert_eq!(value_type, ValueType::Integer);
                assert!(required);
                assert_eq!(min, Some(BigDecimal::from(0)));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
