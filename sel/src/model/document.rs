//! JSON schema files and instance documents
//!
//! A schema file names its root type and lists element types:
//!
//! ```json
//! { "root": "Person",
//!   "types": [ { "name": "Person", "properties": [
//!     { "name": "Age", "kind": "value", "type": "integer", "min": 0 } ] } ] }
//! ```
//!
//! An instance document mirrors the element tree: scalars fill value
//! properties, arrays fill list properties and objects fill element
//! properties.

use super::schema::{ElementTypeBuilder, PropertyKind, Schema, SchemaBuilder};
use super::{Element, ModelError};
use crate::error::{CompileError, Result};
use crate::eval::Engine;
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// Parsed schema file
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    /// Type instantiated for instance documents
    pub root: String,
    #[serde(default)]
    pub types: Vec<ElementTypeBuilder>,
}

impl SchemaDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read(path)?)
    }

    /// Compile every type against `engine`
    pub fn build(&self, engine: Engine) -> Result<Rc<Schema>> {
        let schema = self
            .types
            .iter()
            .cloned()
            .fold(SchemaBuilder::with_engine(engine), SchemaBuilder::element_type)
            .build()?;
        if schema.element_type(&self.root).is_none() {
            return Err(ModelError::UnknownType(self.root.clone()).into());
        }
        Ok(schema)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CompileError::io_error(format!("cannot read {}: {e}", path.display())))
}

/// Instantiate `type_name` and fill it from a JSON document
pub fn load_instance(schema: &Rc<Schema>, type_name: &str, text: &str) -> Result<Element> {
    let data: Json = serde_json::from_str(text)?;
    let element = schema.instantiate(type_name)?;
    if let Err(e) = populate(&element, &data) {
        element.dispose();
        return Err(e.into());
    }
    debug!(element = %element, "loaded instance document");
    Ok(element)
}

pub fn load_instance_file(schema: &Rc<Schema>, type_name: &str, path: &Path) -> Result<Element> {
    load_instance(schema, type_name, &read(path)?)
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

fn mismatch(element: &Element, property: &str, expected: &str, found: &Json) -> ModelError {
    ModelError::Document(format!(
        "Property {property} of element type {} expects {expected}, found {}.",
        element.element_type().name(),
        json_kind(found)
    ))
}

/// Fill `element` from a JSON object
pub fn populate(element: &Element, data: &Json) -> std::result::Result<(), ModelError> {
    let Json::Object(fields) = data else {
        return Err(ModelError::Document(format!(
            "Element of type {} expects an object, found {}.",
            element.element_type().name(),
            json_kind(data)
        )));
    };
    for (name, value) in fields {
        let property = element
            .element_type()
            .property(name)
            .ok_or_else(|| ModelError::UnknownProperty {
                property: name.clone(),
                element_type: element.element_type().name().to_string(),
            })?;
        match (&property.kind, value) {
            (PropertyKind::Value(_), Json::Null) => element.write(name, None)?,
            (PropertyKind::Value(_), Json::String(text)) => element.write(name, Some(text))?,
            (PropertyKind::Value(_), Json::Number(_) | Json::Bool(_)) => {
                element.write(name, Some(&value.to_string()))?
            }
            (PropertyKind::Value(_), other) => {
                return Err(mismatch(element, name, "a scalar", other));
            }
            (PropertyKind::List { .. }, Json::Array(items)) => {
                for item in items {
                    let child = element.insert(name)?;
                    populate(&child, item)?;
                }
            }
            (PropertyKind::List { .. }, other) => {
                return Err(mismatch(element, name, "an array", other));
            }
            (PropertyKind::Element { .. }, Json::Null) => element.clear_element(name)?,
            (PropertyKind::Element { .. }, Json::Object(_)) => {
                let child = element.create_element(name)?;
                populate(&child, value)?;
            }
            (PropertyKind::Element { .. }, other) => {
                return Err(mismatch(element, name, "an object", other));
            }
        }
    }
    Ok(())
}

/// Stored content of an element tree; derived and unset values are left
/// out
pub fn to_json(element: &Element) -> Json {
    let mut fields = Map::new();
    for property in element.element_type().properties() {
        let name = &property.name;
        match &property.kind {
            PropertyKind::Value(spec) if spec.derived.is_none() => {
                if let Ok(Some(text)) = element.text(name) {
                    fields.insert(name.clone(), Json::String(text));
                }
            }
            PropertyKind::Value(_) => {}
            PropertyKind::List { .. } => {
                let items = element.list(name).unwrap_or_default();
                fields.insert(name.clone(), Json::Array(items.iter().map(to_json).collect()));
            }
            PropertyKind::Element { .. } => {
                if let Ok(Some(child)) = element.element(name) {
                    fields.insert(name.clone(), to_json(&child));
                }
            }
        }
    }
    Json::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Value;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "root": "Team",
        "types": [
            { "name": "Team", "properties": [
                { "name": "Name", "kind": "value", "required": true },
                { "name": "Members", "kind": "list", "element_type": "Member", "min_count": 1 },
                { "name": "Headcount", "kind": "value", "type": "integer",
                  "derived": "${ Members.Size }" },
                { "name": "Coach", "kind": "element", "element_type": "Member" }
            ] },
            { "name": "Member", "properties": [
                { "name": "Age", "kind": "value", "type": "integer", "min": 16,
                  "rules": [ { "expression": "${ Age < 70 }", "message": "Too old.",
                               "severity": "warning" } ] }
            ] }
        ]
    }"#;

    fn schema() -> Rc<Schema> {
        SchemaDocument::from_json(SCHEMA)
            .unwrap()
            .build(Engine::new())
            .unwrap()
    }

    #[test]
    fn test_schema_document_builds() {
        let document = SchemaDocument::from_json(SCHEMA).unwrap();
        assert_eq!(document.root, "Team");
        let schema = document.build(Engine::new()).unwrap();
        assert_eq!(schema.type_names(), vec!["Member", "Team"]);
    }

    #[test]
    fn test_unknown_root_type() {
        let document = SchemaDocument::from_json(r#"{ "root": "Nope" }"#).unwrap();
        let err = document.build(Engine::new()).unwrap_err();
        assert_eq!(err.message(), "Element type Nope is undefined.");
    }

    #[test]
    fn test_instance_round_trip() {
        let schema = schema();
        let data = json!({
            "Name": "Rovers",
            "Members": [ { "Age": 17 }, { "Age": "72" } ],
            "Coach": { "Age": 50 }
        });
        let team = load_instance(&schema, "Team", &data.to_string()).unwrap();
        assert_eq!(team.read("Headcount").unwrap(), Value::Integer(2));
        assert_eq!(team.element_validation().message, "Too old.");
        assert_eq!(
            to_json(&team),
            json!({
                "Name": "Rovers",
                "Members": [ { "Age": "17" }, { "Age": "72" } ],
                "Coach": { "Age": "50" }
            })
        );
        team.dispose();
    }

    #[test]
    fn test_shape_mismatch() {
        let schema = schema();
        let err = load_instance(&schema, "Team", r#"{ "Members": 3 }"#).unwrap_err();
        assert_eq!(
            err.message(),
            "Property Members of element type Team expects an array, found a number."
        );
        let err = load_instance(&schema, "Team", r#"{ "Colour": "red" }"#).unwrap_err();
        assert_eq!(
            err.message(),
            "Property Colour is undefined for element type Team."
        );
    }
}
