//! Property services seen from expressions: validation and enablement

use crate::eval::error::{FunctionError, FunctionOutcome};
use crate::eval::registry::Call;
use crate::eval::value::Value;

/// Status of a property, or the merged status of an element
pub(super) fn builtin_validation(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    match call.operand(0)? {
        Value::Null => Err(FunctionError::null_operand(call.name(), 0)),
        Value::Property(property) => {
            let status = property
                .element()
                .validation_in(property.name(), call.tracker())?;
            Ok(Value::Status(status))
        }
        Value::Element(element) => Ok(Value::Status(element.element_validation_in(call.tracker()))),
        other => Err(call.undefined(&[&other])),
    }
}

/// Enablement of a property; an element is enabled when the property
/// holding it is
pub(super) fn builtin_enabled(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    match call.operand(0)? {
        Value::Null => Err(FunctionError::null_operand(call.name(), 0)),
        Value::Property(property) => {
            let enabled = property
                .element()
                .enabled_in(property.name(), call.tracker())?;
            Ok(Value::Boolean(enabled))
        }
        Value::Element(element) => Ok(Value::Boolean(element.container_enabled_in(call.tracker()))),
        other => Err(call.undefined(&[&other])),
    }
}

pub(super) fn builtin_severity(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    match call.non_null(0)? {
        Value::Status(status) => Ok(Value::String(status.severity.to_string())),
        other => Err(call.undefined(&[&other])),
    }
}

pub(super) fn builtin_message(call: &mut Call<'_>) -> FunctionOutcome<Value> {
    match call.non_null(0)? {
        Value::Status(status) => Ok(Value::String(status.message)),
        other => Err(call.undefined(&[&other])),
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::{ContextRef, Engine, FunctionResult, MapContext, Value};
    use crate::model::{Element, ElementTypeBuilder, PropertyBuilder, SchemaBuilder, ValueType};
    use crate::observe::Event;
    use std::cell::Cell;
    use std::rc::Rc;

    fn order() -> Element {
        let schema = SchemaBuilder::new()
            .element_type(
                ElementTypeBuilder::new("Order")
                    .property(
                        PropertyBuilder::value("Express", ValueType::Boolean).default_text("false"),
                    )
                    .property(
                        PropertyBuilder::element("Address", "Address")
                            .enabled("${ Express }")
                            .depends_on("Express"),
                    )
                    .property(PropertyBuilder::list("Lines", "Line")),
            )
            .element_type(
                ElementTypeBuilder::new("Address")
                    .property(PropertyBuilder::value("City", ValueType::String).required()),
            )
            .element_type(
                ElementTypeBuilder::new("Line")
                    .property(PropertyBuilder::value("Amount", ValueType::Integer)),
            )
            .build()
            .unwrap();
        schema.instantiate("Order").unwrap()
    }

    fn invalidations(result: &FunctionResult) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _ = result.attach(Rc::new(move |event: &Event| {
            if *event == Event::Invalidated {
                c.set(c.get() + 1);
            }
        }));
        count
    }

    fn message(source: &str) -> String {
        let context: ContextRef = MapContext::new();
        let result = Engine::new().evaluate(source, &context).unwrap();
        let outcome = result.outcome();
        outcome.status.message.clone()
    }

    #[test]
    fn test_enabled_follows_container() {
        let order = order();
        let address = order.create_element("Address").unwrap();
        let result = Engine::new()
            .evaluate("${ Enabled(City) }", &address.context())
            .unwrap();
        assert_eq!(result.value(), Value::Boolean(false));

        let count = invalidations(&result);
        order.write("Express", Some("true")).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(result.value(), Value::Boolean(true));
        drop(result);
        order.dispose();
    }

    #[test]
    fn test_disabled_property_is_valid() {
        let order = order();
        let address = order.create_element("Address").unwrap();
        let engine = Engine::new();
        let severity = engine
            .evaluate("${ Validation(City).Severity }", &address.context())
            .unwrap();
        assert_eq!(severity.value(), Value::from("ok"));

        order.write("Express", Some("true")).unwrap();
        assert_eq!(severity.value(), Value::from("error"));
        address.write("City", Some("Lund")).unwrap();
        assert_eq!(severity.value(), Value::from("ok"));
        drop(severity);
        order.dispose();
    }

    #[test]
    fn test_element_enabled_and_validation() {
        let order = order();
        let address = order.create_element("Address").unwrap();
        let engine = Engine::new();
        let enabled = engine.evaluate("${ Enabled(This) }", &address.context()).unwrap();
        let status = engine
            .evaluate("${ Message(Validation(Address)) }", &order.context())
            .unwrap();
        assert_eq!(enabled.value(), Value::Boolean(false));
        assert_eq!(status.value(), Value::from(""));

        order.write("Express", Some("true")).unwrap();
        assert_eq!(enabled.value(), Value::Boolean(true));
        drop((enabled, status));
        order.dispose();
    }

    #[test]
    fn test_index_of_this_follows_removal() {
        let order = order();
        let first = order.insert("Lines").unwrap();
        let second = order.insert("Lines").unwrap();
        let result = Engine::new()
            .evaluate("${ Index(This) }", &second.context())
            .unwrap();
        assert_eq!(result.value(), Value::Integer(1));

        let count = invalidations(&result);
        order.remove("Lines", &first).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(result.value(), Value::Integer(0));

        let root_index = Engine::new()
            .evaluate("${ Index(This) }", &order.context())
            .unwrap();
        assert_eq!(root_index.value(), Value::Null);
        drop((result, root_index));
        order.dispose();
    }

    #[test]
    fn test_nulls_are_rejected() {
        for (source, name) in [
            ("${ Validation(null) }", "Validation"),
            ("${ Enabled(null) }", "Enabled"),
            ("${ Parent(null) }", "Parent"),
            ("${ Root(null) }", "Root"),
            ("${ Severity(null) }", "Severity"),
            ("${ Message(null) }", "Message"),
            ("${ Matches(null, 'a') }", "Matches"),
            ("${ Head(null, 1) }", "Head"),
        ] {
            assert_eq!(
                message(source),
                format!("Function {name} does not accept nulls in position 0.")
            );
        }
        assert_eq!(
            message("${ Matches('a', null) }"),
            "Function Matches does not accept nulls in position 1."
        );
    }

    #[test]
    fn test_severity_of_non_status_is_undefined() {
        assert_eq!(message("${ Severity(1) }"), "Function Severity( BigInteger ) is undefined.");
    }
}
