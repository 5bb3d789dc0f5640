//! Function context of an element: identifiers name its properties

use super::element::{Element, PropertyRef, WeakElement};
use crate::eval::{
    ContextRef, ErrorKind, FunctionContext, FunctionError, FunctionOutcome, MapContext, Tracker,
    Value,
};
use crate::observe::{Event, ListenerList};
use std::cell::Cell;
use std::rc::Rc;

/// Resolves bare identifiers to properties of one element, falling back to
/// host variables when given
pub struct ElementContext {
    element: WeakElement,
    element_type: String,
    globals: Option<Rc<MapContext>>,
    lifecycle: Rc<ListenerList>,
    disposed: Cell<bool>,
}

impl ElementContext {
    pub fn new(element: &Element) -> ContextRef {
        Rc::new(Self::build(element, None))
    }

    pub fn with_globals(element: &Element, globals: Rc<MapContext>) -> ContextRef {
        Rc::new(Self::build(element, Some(globals)))
    }

    fn build(element: &Element, globals: Option<Rc<MapContext>>) -> Self {
        ElementContext {
            element: element.downgrade(),
            element_type: element.element_type().name().to_string(),
            globals,
            lifecycle: ListenerList::new(),
            disposed: Cell::new(false),
        }
    }
}

impl FunctionContext for ElementContext {
    fn resolve(&self, name: &str, tracker: &mut Tracker) -> FunctionOutcome<Value> {
        tracker.depend_on(&self.lifecycle);
        if self.disposed.get() {
            return Err(FunctionError::disposed());
        }
        let Some(element) = self.element.upgrade() else {
            return Err(FunctionError::disposed());
        };
        if element.element_type().has_property(name) {
            return Ok(Value::Property(PropertyRef::new(element, name)));
        }
        match &self.globals {
            Some(globals) => globals.resolve(name, tracker).map_err(|e| {
                if e.kind == ErrorKind::UndefinedVariable {
                    FunctionError::undefined_property(name, &self.element_type)
                } else {
                    e
                }
            }),
            None => Err(FunctionError::undefined_property(name, &self.element_type)),
        }
    }

    fn element(&self) -> Option<Element> {
        self.element.upgrade()
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.lifecycle.notify(&Event::Disposed);
        self.lifecycle.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}
