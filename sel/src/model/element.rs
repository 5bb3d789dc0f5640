//! Elements, their properties and the services computed for them

use super::context::ElementContext;
use super::schema::{ElementType, PropertyDef, PropertyKind, Rule, Schema};
use super::validation::{check_count, check_value};
use super::ModelError;
use crate::eval::{
    ContextRef, Function, FunctionError, FunctionOutcome, FunctionResult, MapContext, Outcome,
    Status, Tracker, Value,
};
use crate::observe::{Event, Listener, ListenerList, Subscription};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Handle to a model element. Clones share the element; equality is
/// identity.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

pub(crate) struct ElementData {
    id: u64,
    schema: Rc<Schema>,
    element_type: Rc<ElementType>,
    /// Parent element and the property holding this one
    parent: Option<(Weak<ElementData>, String)>,
    values: RefCell<HashMap<String, String>>,
    lists: RefCell<HashMap<String, Vec<Element>>>,
    elements: RefCell<HashMap<String, Element>>,
    listeners: HashMap<String, PropertyListeners>,
    services: RefCell<HashMap<(String, Service), Rc<ServiceSlot>>>,
    disposed: Cell<bool>,
}

/// Listeners of one property. `all` hears content changes and refreshes;
/// `content` hears content changes only.
struct PropertyListeners {
    all: Rc<ListenerList>,
    content: Rc<ListenerList>,
}

impl PropertyListeners {
    fn new() -> Self {
        PropertyListeners {
            all: ListenerList::new(),
            content: ListenerList::new(),
        }
    }

    fn len(&self) -> usize {
        self.all.len() + self.content.len()
    }
}

/// Facet of a property computed by an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Service {
    Derived,
    Enablement,
    Rule(usize),
}

struct ServiceSlot {
    result: FunctionResult,
    subscription: RefCell<Option<Subscription>>,
}

/// Weak handle used by contexts, which must not keep their element alive
#[derive(Clone)]
pub(crate) struct WeakElement(Weak<ElementData>);

impl WeakElement {
    pub(crate) fn upgrade(&self) -> Option<Element> {
        self.0.upgrade().map(Element)
    }
}

impl Element {
    pub(crate) fn new(
        schema: Rc<Schema>,
        element_type: Rc<ElementType>,
        parent: Option<(&Element, &str)>,
    ) -> Element {
        let listeners = element_type
            .properties()
            .iter()
            .map(|p| (p.name.clone(), PropertyListeners::new()))
            .collect();
        Element(Rc::new(ElementData {
            id: schema.next_id(),
            schema,
            element_type,
            parent: parent
                .map(|(element, property)| (Rc::downgrade(&element.0), property.to_string())),
            values: RefCell::new(HashMap::new()),
            lists: RefCell::new(HashMap::new()),
            elements: RefCell::new(HashMap::new()),
            listeners,
            services: RefCell::new(HashMap::new()),
            disposed: Cell::new(false),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn element_type(&self) -> &ElementType {
        &self.0.element_type
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.0.schema
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    pub(crate) fn downgrade(&self) -> WeakElement {
        WeakElement(Rc::downgrade(&self.0))
    }

    fn check_live(&self) -> Result<(), ModelError> {
        if self.is_disposed() {
            Err(ModelError::Disposed)
        } else {
            Ok(())
        }
    }

    fn property(&self, name: &str) -> Result<&PropertyDef, ModelError> {
        self.0
            .element_type
            .property(name)
            .ok_or_else(|| ModelError::UnknownProperty {
                property: name.to_string(),
                element_type: self.0.element_type.name().to_string(),
            })
    }

    fn listeners(&self, name: &str) -> Result<&PropertyListeners, ModelError> {
        self.property(name)?;
        self.0
            .listeners
            .get(name)
            .ok_or_else(|| ModelError::UnknownProperty {
                property: name.to_string(),
                element_type: self.0.element_type.name().to_string(),
            })
    }

    fn wrong_kind(name: &str, expected: &'static str) -> ModelError {
        ModelError::WrongKind {
            property: name.to_string(),
            expected,
        }
    }

    // Content

    /// Set or clear the text of a value property
    pub fn write(&self, name: &str, text: Option<&str>) -> Result<(), ModelError> {
        self.check_live()?;
        let property = self.property(name)?;
        if property.value_spec().is_none() {
            return Err(Self::wrong_kind(name, "value"));
        }
        if property.is_derived() {
            return Err(ModelError::ReadOnly(name.to_string()));
        }
        let changed = {
            let mut values = self.0.values.borrow_mut();
            let previous = match text {
                Some(text) => values.insert(name.to_string(), text.to_string()),
                None => values.remove(name),
            };
            previous.as_deref() != text
        };
        if changed {
            debug!(element = %self, property = name, ?text, "wrote property");
            self.changed(name);
        }
        Ok(())
    }

    /// Stored text of a value property, or the text of a derived value
    pub fn text(&self, name: &str) -> Result<Option<String>, ModelError> {
        let property = self.property(name)?;
        if property.value_spec().is_none() {
            return Err(Self::wrong_kind(name, "value"));
        }
        if property.is_derived() {
            let value = self.read(name)?;
            return Ok(if value.is_null() {
                None
            } else {
                value.coerce_to_string()
            });
        }
        Ok(self.0.values.borrow().get(name).cloned())
    }

    /// Typed content: value properties read through their type and
    /// default, list properties as a list of elements, element properties
    /// as the element or null
    pub fn read(&self, name: &str) -> Result<Value, ModelError> {
        self.property(name)?;
        self.content(name)
            .map_err(|e| ModelError::Evaluation(e.message))
    }

    pub(crate) fn content_in(&self, name: &str, tracker: &mut Tracker) -> FunctionOutcome<Value> {
        tracker.depend_on(&self.listeners(name)?.content);
        self.content(name)
    }

    fn content(&self, name: &str) -> FunctionOutcome<Value> {
        if self.is_disposed() {
            return Err(FunctionError::model(ModelError::Disposed.to_string()));
        }
        let property = self.property(name)?;
        match &property.kind {
            PropertyKind::Value(spec) => {
                if let Some(derived) = &spec.derived {
                    let outcome = self.service(name, Service::Derived, derived);
                    if outcome.status.is_error() {
                        return Err(FunctionError::operand(&outcome.status.message));
                    }
                    return Ok(outcome.value.clone());
                }
                let text = self.effective_text(name, spec.default.as_deref());
                Ok(text
                    .filter(|t| !t.trim().is_empty())
                    .and_then(|t| spec.value_type.parse(t.trim()))
                    .unwrap_or(Value::Null))
            }
            PropertyKind::List { .. } => {
                let items = self.0.lists.borrow().get(name).cloned().unwrap_or_default();
                Ok(Value::List(items.into_iter().map(Value::Element).collect()))
            }
            PropertyKind::Element { .. } => Ok(self
                .0
                .elements
                .borrow()
                .get(name)
                .cloned()
                .map(Value::Element)
                .unwrap_or(Value::Null)),
        }
    }

    fn effective_text(&self, name: &str, default: Option<&str>) -> Option<String> {
        self.0
            .values
            .borrow()
            .get(name)
            .cloned()
            .or_else(|| default.map(str::to_string))
    }

    /// Items of a list property
    pub fn list(&self, name: &str) -> Result<Vec<Element>, ModelError> {
        match self.property(name)?.kind {
            PropertyKind::List { .. } => {
                Ok(self.0.lists.borrow().get(name).cloned().unwrap_or_default())
            }
            _ => Err(Self::wrong_kind(name, "list")),
        }
    }

    /// Append a new item to a list property
    pub fn insert(&self, name: &str) -> Result<Element, ModelError> {
        self.check_live()?;
        let child_type = match &self.property(name)?.kind {
            PropertyKind::List { element_type, .. } => element_type.clone(),
            _ => return Err(Self::wrong_kind(name, "list")),
        };
        let child = self.create_child(name, &child_type)?;
        self.0
            .lists
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(child.clone());
        debug!(element = %self, property = name, item = %child, "inserted list item");
        self.changed(name);
        Ok(child)
    }

    /// Remove and dispose an item of a list property
    pub fn remove(&self, name: &str, item: &Element) -> Result<(), ModelError> {
        self.check_live()?;
        self.list(name)?;
        let removed = {
            let mut lists = self.0.lists.borrow_mut();
            let items = lists.entry(name.to_string()).or_default();
            let position = items
                .iter()
                .position(|e| e == item)
                .ok_or_else(|| ModelError::NotAnItem(name.to_string()))?;
            items.remove(position)
        };
        removed.dispose();
        self.changed(name);
        Ok(())
    }

    /// Element held by an element property
    pub fn element(&self, name: &str) -> Result<Option<Element>, ModelError> {
        match self.property(name)?.kind {
            PropertyKind::Element { .. } => Ok(self.0.elements.borrow().get(name).cloned()),
            _ => Err(Self::wrong_kind(name, "element")),
        }
    }

    /// Element held by an element property, created when absent
    pub fn create_element(&self, name: &str) -> Result<Element, ModelError> {
        self.check_live()?;
        let child_type = match &self.property(name)?.kind {
            PropertyKind::Element { element_type } => element_type.clone(),
            _ => return Err(Self::wrong_kind(name, "element")),
        };
        if let Some(existing) = self.element(name)? {
            return Ok(existing);
        }
        let child = self.create_child(name, &child_type)?;
        self.0
            .elements
            .borrow_mut()
            .insert(name.to_string(), child.clone());
        self.changed(name);
        Ok(child)
    }

    /// Dispose and drop the element held by an element property
    pub fn clear_element(&self, name: &str) -> Result<(), ModelError> {
        self.check_live()?;
        self.element(name)?;
        let removed = self.0.elements.borrow_mut().remove(name);
        if let Some(child) = removed {
            child.dispose();
            self.changed(name);
        }
        Ok(())
    }

    fn create_child(&self, property: &str, type_name: &str) -> Result<Element, ModelError> {
        let element_type = self
            .0
            .schema
            .element_type(type_name)
            .ok_or_else(|| ModelError::UnknownType(type_name.to_string()))?;
        Ok(Element::new(
            Rc::clone(&self.0.schema),
            element_type,
            Some((self, property)),
        ))
    }

    /// Every list item and held element, in declaration order
    pub fn children(&self) -> Vec<Element> {
        let mut children = Vec::new();
        for property in self.0.element_type.properties() {
            self.children_in(property, &mut children);
        }
        children
    }

    fn children_in(&self, property: &PropertyDef, children: &mut Vec<Element>) {
        match property.kind {
            PropertyKind::List { .. } => {
                if let Some(items) = self.0.lists.borrow().get(&property.name) {
                    children.extend(items.iter().cloned());
                }
            }
            PropertyKind::Element { .. } => {
                if let Some(child) = self.0.elements.borrow().get(&property.name) {
                    children.push(child.clone());
                }
            }
            PropertyKind::Value(_) => {}
        }
    }

    // Structure

    /// Parent element; `None` at the root
    pub fn parent(&self) -> Option<Element> {
        self.0
            .parent
            .as_ref()
            .and_then(|(parent, _)| parent.upgrade())
            .map(Element)
    }

    /// Name of the parent's property holding this element
    pub fn parent_property(&self) -> Option<&str> {
        self.0.parent.as_ref().map(|(_, name)| name.as_str())
    }

    pub fn root(&self) -> Element {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Position within the parent's list property; `None` for roots and
    /// held elements
    pub fn index(&self) -> Option<usize> {
        let parent = self.parent()?;
        let property = self.parent_property()?;
        let lists = parent.0.lists.borrow();
        lists.get(property)?.iter().position(|e| e == self)
    }

    pub(crate) fn index_in(&self, tracker: &mut Tracker) -> Option<usize> {
        if let (Some(parent), Some(property)) = (self.parent(), self.parent_property()) {
            if let Ok(listeners) = parent.listeners(property) {
                tracker.depend_on(&listeners.content);
            }
        }
        self.index()
    }

    // Services

    pub fn enabled(&self, name: &str) -> Result<bool, ModelError> {
        self.enabled_in(name, &mut Tracker::default())
    }

    /// A property is enabled when its enablement expression holds and the
    /// element itself is enabled. A failing expression counts as enabled.
    pub(crate) fn enabled_in(&self, name: &str, tracker: &mut Tracker) -> Result<bool, ModelError> {
        tracker.depend_on(&self.listeners(name)?.all);
        if !self.container_enabled_in(tracker) {
            return Ok(false);
        }
        let property = self.property(name)?;
        let Some(enablement) = &property.enablement else {
            return Ok(true);
        };
        if self.is_disposed() {
            return Err(ModelError::Disposed);
        }
        let outcome = self.service(name, Service::Enablement, enablement);
        if outcome.status.is_error() {
            warn!(element = %self, property = name, status = %outcome.status, "enablement failed");
            return Ok(true);
        }
        match outcome.value.coerce_to_bool() {
            Some(enabled) => Ok(enabled),
            None => {
                warn!(
                    element = %self,
                    property = name,
                    value_type = outcome.value.type_name(),
                    "enablement is not a boolean"
                );
                Ok(true)
            }
        }
    }

    /// Enablement of the property holding this element; roots are enabled
    pub(crate) fn container_enabled_in(&self, tracker: &mut Tracker) -> bool {
        match (self.parent(), self.parent_property()) {
            (Some(parent), Some(property)) => parent.enabled_in(property, tracker).unwrap_or(true),
            _ => true,
        }
    }

    pub fn validation(&self, name: &str) -> Result<Status, ModelError> {
        self.validation_in(name, &mut Tracker::default())
    }

    /// Built-in checks first, then expression rules in declaration order;
    /// the worst status wins. Disabled properties are always valid.
    pub(crate) fn validation_in(
        &self,
        name: &str,
        tracker: &mut Tracker,
    ) -> Result<Status, ModelError> {
        if !self.enabled_in(name, tracker)? {
            return Ok(Status::ok());
        }
        self.check_live()?;
        let property = self.property(name)?;
        let builtin = match &property.kind {
            PropertyKind::Value(spec) if spec.derived.is_none() => {
                let text = self.effective_text(name, spec.default.as_deref());
                check_value(&property.label, spec, text.as_deref())
            }
            PropertyKind::List {
                min_count,
                max_count,
                ..
            } => {
                let count = self.0.lists.borrow().get(name).map_or(0, Vec::len);
                check_count(&property.label, count, *min_count, *max_count)
            }
            _ => Status::ok(),
        };
        let mut statuses = vec![builtin];
        for (index, rule) in property.rules.iter().enumerate() {
            statuses.push(self.rule_status(name, index, rule));
        }
        Ok(Status::merge(statuses))
    }

    fn rule_status(&self, name: &str, index: usize, rule: &Rule) -> Status {
        let outcome = self.service(name, Service::Rule(index), &rule.function);
        if outcome.status.is_error() {
            return outcome.status.clone();
        }
        match &outcome.value {
            Value::Status(status) => status.clone(),
            value => match value.coerce_to_bool() {
                Some(true) => Status::ok(),
                Some(false) => Status::new(rule.severity, rule.message.clone()),
                None => Status::error(format!(
                    "Validation rule of {name} produced {}, not a boolean.",
                    value.type_name()
                )),
            },
        }
    }

    /// Worst status of every property and child element
    pub fn element_validation(&self) -> Status {
        self.element_validation_in(&mut Tracker::default())
    }

    pub(crate) fn element_validation_in(&self, tracker: &mut Tracker) -> Status {
        if self.is_disposed() {
            return Status::error(ModelError::Disposed.to_string());
        }
        let mut statuses = Vec::new();
        for property in self.0.element_type.properties() {
            match self.validation_in(&property.name, tracker) {
                Ok(status) => statuses.push(status),
                Err(e) => statuses.push(Status::error(e.to_string())),
            }
        }
        for child in self.children() {
            statuses.push(child.element_validation_in(tracker));
        }
        Status::merge(statuses)
    }

    /// Cached result of one property service, created on first use
    fn service(&self, name: &str, service: Service, function: &Rc<Function>) -> Rc<Outcome> {
        let key = (name.to_string(), service);
        let existing = self.0.services.borrow().get(&key).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let result = function.evaluate(&self.context());
                let subscription = result.attach(self.service_listener(name, service));
                let slot = Rc::new(ServiceSlot {
                    result,
                    subscription: RefCell::new(Some(subscription)),
                });
                self.0.services.borrow_mut().insert(key, Rc::clone(&slot));
                debug!(element = %self, property = name, ?service, "created property service");
                slot
            }
        };
        slot.result.outcome()
    }

    /// Forwards invalidation of a service result to the property's
    /// listeners
    fn service_listener(&self, name: &str, service: Service) -> Listener {
        let element = Rc::downgrade(&self.0);
        let property = name.to_string();
        Rc::new(move |event: &Event| {
            if *event != Event::Invalidated {
                return;
            }
            let Some(element) = element.upgrade().map(Element) else {
                return;
            };
            match service {
                Service::Derived => element.changed(&property),
                Service::Enablement | Service::Rule(_) => element.refresh(&property),
            }
        })
    }

    pub fn service_count(&self) -> usize {
        self.0.services.borrow().len()
    }

    // Events

    /// Readers of the content are not told about refreshes
    fn refresh(&self, name: &str) {
        if let Some(listeners) = self.0.listeners.get(name) {
            listeners.all.notify(&Event::PropertyRefresh {
                property: name.to_string(),
            });
        }
    }

    /// Content of `name` changed: tell its listeners, then refresh the
    /// properties declaring a dependency on it
    fn changed(&self, name: &str) {
        if let Some(listeners) = self.0.listeners.get(name) {
            let event = Event::PropertyContent {
                property: name.to_string(),
            };
            listeners.content.notify(&event);
            listeners.all.notify(&event);
        }
        for property in self.0.element_type.properties() {
            if property.depends_on_sibling(name) {
                self.refresh(&property.name);
            }
        }
        // Only items whose type declares a `../name` dependency are visited
        for property in self.0.element_type.properties() {
            let Some(child_type) = property
                .child_type()
                .and_then(|type_name| self.0.schema.element_type(type_name))
            else {
                continue;
            };
            let dependents: Vec<&str> = child_type
                .properties()
                .iter()
                .filter(|p| p.depends_on_parent(name))
                .map(|p| p.name.as_str())
                .collect();
            if dependents.is_empty() {
                continue;
            }
            let mut children = Vec::new();
            self.children_in(property, &mut children);
            for child in children {
                for dependent in &dependents {
                    child.refresh(dependent);
                }
            }
        }
    }

    /// Listen to content and refresh events of one property
    pub fn attach(&self, name: &str, listener: Listener) -> Result<Subscription, ModelError> {
        Ok(self.listeners(name)?.all.attach(listener))
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.0.listeners.get(name).map_or(0, PropertyListeners::len)
    }

    /// Listeners across all properties of this element
    pub fn total_listener_count(&self) -> usize {
        self.0.listeners.values().map(PropertyListeners::len).sum()
    }

    // Lifecycle

    /// Context resolving identifiers to this element's properties
    pub fn context(&self) -> ContextRef {
        ElementContext::new(self)
    }

    /// Context that falls back to host variables for other identifiers
    pub fn context_with(&self, globals: Rc<MapContext>) -> ContextRef {
        ElementContext::with_globals(self, globals)
    }

    /// Dispose service results and children and drop every listener.
    /// The element is unusable afterwards.
    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        let services: Vec<Rc<ServiceSlot>> = self
            .0
            .services
            .borrow_mut()
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in services {
            if let Some(subscription) = slot.subscription.borrow_mut().take() {
                subscription.detach();
            }
            slot.result.dispose();
        }
        for child in self.children() {
            child.dispose();
        }
        self.0.lists.borrow_mut().clear();
        self.0.elements.borrow_mut().clear();
        for listeners in self.0.listeners.values() {
            for list in [&listeners.content, &listeners.all] {
                list.notify(&Event::Disposed);
                list.clear();
            }
        }
        debug!(element = %self, "disposed element");
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.element_type.name(), self.0.id)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", &self.0.element_type.name())
            .field("id", &self.0.id)
            .field("disposed", &self.0.disposed.get())
            .finish()
    }
}

/// Reference to one property of one element
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    element: Element,
    name: String,
}

impl PropertyRef {
    pub fn new(element: Element, name: &str) -> Self {
        PropertyRef {
            element,
            name: name.to_string(),
        }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content of the property, recording the read in `tracker`
    pub fn content(&self, tracker: &mut Tracker) -> FunctionOutcome<Value> {
        self.element.content_in(&self.name, tracker)
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.element, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Engine, Severity};
    use crate::model::{ElementTypeBuilder, PropertyBuilder, SchemaBuilder, ValueType};

    fn schema() -> Rc<Schema> {
        SchemaBuilder::new()
            .element_type(
                ElementTypeBuilder::new("Order")
                    .property(PropertyBuilder::value("Customer", ValueType::String).required())
                    .property(
                        PropertyBuilder::value("Express", ValueType::Boolean).default_text("false"),
                    )
                    .property(
                        PropertyBuilder::value("Courier", ValueType::String)
                            .enabled("${ Express }")
                            .required()
                            .depends_on("Express"),
                    )
                    .property(PropertyBuilder::list("Lines", "Line").count(Some(1), None))
                    .property(
                        PropertyBuilder::value("Total", ValueType::Decimal)
                            .derived("${ Sum(Lines, 'Amount') }"),
                    )
                    .property(PropertyBuilder::element("Address", "Address")),
            )
            .element_type(
                ElementTypeBuilder::new("Line")
                    .property(PropertyBuilder::value("Amount", ValueType::Integer).min(0))
                    .property(
                        PropertyBuilder::value("Note", ValueType::String)
                            .rule_with("${ Size(Note) < 10 }", "Note is long.", Severity::Warning),
                    ),
            )
            .element_type(
                ElementTypeBuilder::new("Address")
                    .property(PropertyBuilder::value("City", ValueType::String)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_write_and_read_typed() {
        let order = schema().instantiate("Order").unwrap();
        assert_eq!(order.read("Customer").unwrap(), Value::Null);
        order.write("Customer", Some("Ada")).unwrap();
        assert_eq!(order.read("Customer").unwrap(), Value::from("Ada"));
        assert_eq!(order.read("Express").unwrap(), Value::Boolean(false));
        assert_eq!(order.text("Express").unwrap(), None);
        order.dispose();
    }

    #[test]
    fn test_write_rejections() {
        let order = schema().instantiate("Order").unwrap();
        assert_eq!(
            order.write("Lines", Some("x")).unwrap_err(),
            ModelError::WrongKind {
                property: "Lines".to_string(),
                expected: "value"
            }
        );
        assert_eq!(
            order.write("Total", Some("1")).unwrap_err(),
            ModelError::ReadOnly("Total".to_string())
        );
        assert!(matches!(
            order.write("Nope", None).unwrap_err(),
            ModelError::UnknownProperty { .. }
        ));
        order.dispose();
    }

    #[test]
    fn test_lists_and_structure() {
        let order = schema().instantiate("Order").unwrap();
        let first = order.insert("Lines").unwrap();
        let second = order.insert("Lines").unwrap();
        assert_eq!(second.index(), Some(1));
        assert_eq!(second.parent(), Some(order.clone()));
        assert_eq!(second.root(), order);
        assert_eq!(second.parent_property(), Some("Lines"));

        order.remove("Lines", &first).unwrap();
        assert!(first.is_disposed());
        assert_eq!(second.index(), Some(0));
        assert_eq!(
            order.remove("Lines", &first).unwrap_err(),
            ModelError::NotAnItem("Lines".to_string())
        );
        order.dispose();
    }

    #[test]
    fn test_element_property() {
        let order = schema().instantiate("Order").unwrap();
        assert_eq!(order.element("Address").unwrap(), None);
        let address = order.create_element("Address").unwrap();
        assert_eq!(order.create_element("Address").unwrap(), address);
        assert_eq!(address.index(), None);
        order.clear_element("Address").unwrap();
        assert!(address.is_disposed());
        assert_eq!(order.read("Address").unwrap(), Value::Null);
        order.dispose();
    }

    #[test]
    fn test_derived_value_follows_items() {
        let order = schema().instantiate("Order").unwrap();
        let line = order.insert("Lines").unwrap();
        line.write("Amount", Some("5")).unwrap();
        assert_eq!(order.read("Total").unwrap(), Value::Integer(5));
        let other = order.insert("Lines").unwrap();
        other.write("Amount", Some("7")).unwrap();
        assert_eq!(order.read("Total").unwrap(), Value::Integer(12));
        assert_eq!(order.text("Total").unwrap().as_deref(), Some("12"));
        order.dispose();
    }

    #[test]
    fn test_enablement_and_validation() {
        let order = schema().instantiate("Order").unwrap();
        assert!(!order.enabled("Courier").unwrap());
        assert!(order.validation("Courier").unwrap().is_ok());

        order.write("Express", Some("true")).unwrap();
        assert!(order.enabled("Courier").unwrap());
        assert_eq!(
            order.validation("Courier").unwrap().message,
            "Courier must be specified."
        );

        assert_eq!(
            order.validation("Lines").unwrap().message,
            "Lines must have at least 1 item(s)."
        );
        order.dispose();
    }

    #[test]
    fn test_rule_severity_and_element_validation() {
        let order = schema().instantiate("Order").unwrap();
        order.write("Customer", Some("Ada")).unwrap();
        let line = order.insert("Lines").unwrap();
        line.write("Note", Some("a rather long note")).unwrap();
        let status = line.validation("Note").unwrap();
        assert_eq!(status.severity, Severity::Warning);
        assert_eq!(status.message, "Note is long.");
        assert_eq!(order.element_validation().severity, Severity::Warning);

        line.write("Amount", Some("-3")).unwrap();
        assert_eq!(
            order.element_validation().message,
            "Value -3 is smaller than the minimum allowed value of 0."
        );
        order.dispose();
    }

    #[test]
    fn test_dependency_refreshes_listeners() {
        let order = schema().instantiate("Order").unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&events);
        let subscription = order
            .attach(
                "Courier",
                Rc::new(move |event: &Event| seen.borrow_mut().push(event.clone())),
            )
            .unwrap();
        order.write("Express", Some("true")).unwrap();
        assert!(events.borrow().contains(&Event::PropertyRefresh {
            property: "Courier".to_string()
        }));
        assert!(subscription.detach());
        order.dispose();
    }

    #[test]
    fn test_refresh_spares_content_readers() {
        let order = schema().instantiate("Order").unwrap();
        let engine = Engine::new();
        let content = engine.evaluate("${ Courier }", &order.context()).unwrap();
        let enabled = engine.evaluate("${ Enabled(Courier) }", &order.context()).unwrap();
        assert_eq!(content.value(), Value::Null);
        assert_eq!(enabled.value(), Value::Boolean(false));

        order.write("Express", Some("true")).unwrap();
        assert!(content.is_cached());
        assert_eq!(content.invalidation_count(), 0);
        assert!(!enabled.is_cached());
        assert_eq!(enabled.value(), Value::Boolean(true));

        order.write("Courier", Some("Bike")).unwrap();
        assert_eq!(content.value(), Value::from("Bike"));
        drop((content, enabled));
        order.dispose();
    }

    #[test]
    fn test_parent_dependency_reaches_only_dependent_items() {
        let schema = SchemaBuilder::new()
            .element_type(
                ElementTypeBuilder::new("Batch")
                    .property(PropertyBuilder::value("Limit", ValueType::Integer))
                    .property(PropertyBuilder::list("Items", "Item"))
                    .property(PropertyBuilder::list("Tags", "Tag")),
            )
            .element_type(
                ElementTypeBuilder::new("Item").property(
                    PropertyBuilder::value("Weight", ValueType::Integer)
                        .rule("${ Weight <= Parent().Limit }", "Too heavy.")
                        .depends_on("../Limit"),
                ),
            )
            .element_type(
                ElementTypeBuilder::new("Tag")
                    .property(PropertyBuilder::value("Label", ValueType::String)),
            )
            .build()
            .unwrap();
        let batch = schema.instantiate("Batch").unwrap();
        let refreshes = Rc::new(Cell::new(0));
        let mut subscriptions = Vec::new();
        for _ in 0..2000 {
            let item = batch.insert("Items").unwrap();
            let seen = Rc::clone(&refreshes);
            subscriptions.push(
                item.attach(
                    "Weight",
                    Rc::new(move |event: &Event| {
                        if matches!(event, Event::PropertyRefresh { .. }) {
                            seen.set(seen.get() + 1);
                        }
                    }),
                )
                .unwrap(),
            );
        }
        let tag = batch.insert("Tags").unwrap();
        let tag_events = Rc::new(Cell::new(0));
        let seen = Rc::clone(&tag_events);
        let tag_subscription = tag
            .attach("Label", Rc::new(move |_: &Event| seen.set(seen.get() + 1)))
            .unwrap();
        assert_eq!(refreshes.get(), 0);

        batch.write("Limit", Some("5")).unwrap();
        assert_eq!(refreshes.get(), 2000);
        assert_eq!(tag_events.get(), 0);

        let first = batch.list("Items").unwrap()[0].clone();
        first.write("Weight", Some("9")).unwrap();
        assert_eq!(first.validation("Weight").unwrap().message, "Too heavy.");
        batch.write("Limit", Some("10")).unwrap();
        assert!(first.validation("Weight").unwrap().is_ok());

        assert!(tag_subscription.detach());
        drop(subscriptions);
        batch.dispose();
    }

    #[test]
    fn test_dispose_releases_everything() {
        let order = schema().instantiate("Order").unwrap();
        order.insert("Lines").unwrap();
        order.read("Total").unwrap();
        order.enabled("Courier").unwrap();
        assert!(order.service_count() > 0);
        assert!(order.listener_count("Lines") > 0);

        order.dispose();
        assert_eq!(order.service_count(), 0);
        assert_eq!(order.total_listener_count(), 0);
        assert_eq!(order.write("Customer", None).unwrap_err(), ModelError::Disposed);
    }
}
