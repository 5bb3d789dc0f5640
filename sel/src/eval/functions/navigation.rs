//! Structural navigation: `This`, `Parent`, `Root`, `Content`

use crate::eval::error::{FunctionError, FunctionOutcome};
use crate::eval::registry::Call;
use crate::eval::value::Value;
use crate::model::Element;

fn element_value(element: Option<Element>) -> Value {
    element.map(Value::Element).unwrap_or(Value::Null)
}

/// Element named by the single operand: a property stands for the element
/// holding it
fn subject(call: &mut Call<'_>) -> FunctionOutcome<Element> {
    let value = call.operand(0)?;
    match value {
        Value::Null => Err(FunctionError::null_operand(call.name(), 0)),
        Value::Property(property) => Ok(property.element().clone()),
        Value::Element(element) => Ok(element),
        other => Err(call.undefined(&[&other])),
    }
}

pub(super) fn builtin_this(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    Ok(element_value(call.context().element()))
}

/// Parent element; null at the root. With an operand, a property yields
/// the element that holds it.
pub(super) fn builtin_parent(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    if call.is_empty() {
        let element = call.context().element();
        return Ok(element_value(element.and_then(|e| e.parent())));
    }
    match call.operand(0)? {
        Value::Property(property) => Ok(Value::Element(property.element().clone())),
        _ => {
            let element = subject(call)?;
            Ok(element_value(element.parent()))
        }
    }
}

pub(super) fn builtin_root(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    if call.is_empty() {
        let element = call.context().element();
        return Ok(element_value(element.map(|e| e.root())));
    }
    let element = subject(call)?;
    Ok(Value::Element(element.root()))
}

/// Property content; any other value passes through
pub(super) fn builtin_content(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    call.content(0)
}

#[cfg(test)]
mod tests {
    use crate::eval::{Engine, Value};
    use crate::model::{Element, ElementTypeBuilder, PropertyBuilder, SchemaBuilder, ValueType};

    fn folder_tree() -> (Element, Element) {
        let schema = SchemaBuilder::new()
            .element_type(
                ElementTypeBuilder::new("Folder")
                    .property(PropertyBuilder::value("Name", ValueType::String))
                    .property(PropertyBuilder::list("Folders", "Folder")),
            )
            .build()
            .unwrap();
        let root = schema.instantiate("Folder").unwrap();
        root.write("Name", Some("root")).unwrap();
        let child = root.insert("Folders").unwrap();
        child.write("Name", Some("child")).unwrap();
        (root, child)
    }

    fn eval(element: &Element, source: &str) -> Value {
        Engine::new()
            .evaluate(source, &element.context())
            .unwrap()
            .value()
    }

    #[test]
    fn test_this_and_parent() {
        let (root, child) = folder_tree();
        assert_eq!(eval(&child, "${ This }"), Value::Element(child.clone()));
        assert_eq!(eval(&child, "${ Parent() }"), Value::Element(root.clone()));
        assert_eq!(eval(&child, "${ Parent().Name }"), Value::from("root"));
        assert_eq!(eval(&root, "${ Parent() }"), Value::Null);
        root.dispose();
    }

    #[test]
    fn test_parent_of_property_is_its_element() {
        let (root, child) = folder_tree();
        assert_eq!(eval(&child, "${ Name.Parent }"), Value::Element(child.clone()));
        root.dispose();
    }

    #[test]
    fn test_root() {
        let (root, child) = folder_tree();
        let grandchild = child.insert("Folders").unwrap();
        assert_eq!(eval(&grandchild, "${ Root().Name }"), Value::from("root"));
        assert_eq!(eval(&grandchild, "${ Root(Parent()) }"), Value::Element(root.clone()));
        root.dispose();
    }

    #[test]
    fn test_member_access_on_null_is_null() {
        let (root, _) = folder_tree();
        assert_eq!(eval(&root, "${ Parent().Name }"), Value::Null);
        root.dispose();
    }

    #[test]
    fn test_content_unwraps_property() {
        let (root, _) = folder_tree();
        let result = Engine::new()
            .evaluate("${ Content(Name) }", &root.context())
            .unwrap();
        assert_eq!(result.value(), Value::from("root"));
        root.write("Name", Some("top")).unwrap();
        assert_eq!(result.value(), Value::from("top"));
        drop(result);
        root.dispose();
    }
}
