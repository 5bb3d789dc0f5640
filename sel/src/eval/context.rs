//! Function contexts: where bare identifiers get their values

use super::error::{FunctionError, FunctionOutcome};
use super::value::Value;
use crate::model::Element;
use crate::observe::{Event, ListenerList};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Lookups of unbound names leave empty lists behind; the table is swept
/// once it doubles past this many entries.
const LISTENER_SWEEP_MIN: usize = 16;

/// Shared reference to a context
pub type ContextRef = Rc<dyn FunctionContext>;

/// Records every listener list a computation read from. The result
/// subscribes to exactly these once the computation finishes.
#[derive(Debug, Default)]
pub struct Tracker {
    sources: Vec<Rc<ListenerList>>,
    seen: HashSet<*const ListenerList>,
}

impl Tracker {
    /// Record `list` once, keeping first-read order
    pub fn depend_on(&mut self, list: &Rc<ListenerList>) {
        if self.seen.insert(Rc::as_ptr(list)) {
            self.sources.push(Rc::clone(list));
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub(crate) fn into_sources(self) -> Vec<Rc<ListenerList>> {
        self.sources
    }
}

/// Resolves identifiers for an evaluation
pub trait FunctionContext {
    /// Value of a bare identifier. Implementations record what they read in
    /// `tracker`, even when the lookup fails, so a later definition
    /// invalidates the result.
    fn resolve(&self, name: &str, tracker: &mut Tracker) -> FunctionOutcome<Value>;

    /// Element the expression is evaluated for, if any
    fn element(&self) -> Option<Element> {
        None
    }

    /// Release every listener the context holds on behalf of results
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Host variables, each with its own listener list
#[derive(Debug, Default)]
pub struct MapContext {
    variables: RefCell<HashMap<String, Value>>,
    listeners: RefCell<HashMap<String, Rc<ListenerList>>>,
    sweep_at: Cell<usize>,
    disposed: Cell<bool>,
}

impl MapContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Build from initial bindings
    pub fn with_variables<I, K>(variables: I) -> Rc<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let context = Self::default();
        context
            .variables
            .borrow_mut()
            .extend(variables.into_iter().map(|(k, v)| (k.into(), v)));
        Rc::new(context)
    }

    /// Bind a variable and notify results that read it
    pub fn set(&self, name: &str, value: Value) {
        self.variables.borrow_mut().insert(name.to_string(), value);
        self.changed(name);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = self.variables.borrow_mut().remove(name);
        if removed.is_some() {
            self.changed(name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of listeners on one variable
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .borrow()
            .get(name)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Names that currently have a listener list
    pub fn tracked_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn listener_list(&self, name: &str) -> Rc<ListenerList> {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(list) = listeners.get(name) {
            return Rc::clone(list);
        }
        if listeners.len() >= self.sweep_at.get() {
            // A list still held by an unfinished tracker has no listeners
            // yet but more than one owner.
            listeners.retain(|_, list| !list.is_empty() || Rc::strong_count(list) > 1);
            self.sweep_at
                .set((listeners.len() * 2).max(LISTENER_SWEEP_MIN));
        }
        let list = ListenerList::new();
        listeners.insert(name.to_string(), Rc::clone(&list));
        list
    }

    fn changed(&self, name: &str) {
        let list = self.listeners.borrow().get(name).cloned();
        if let Some(list) = list {
            list.notify(&Event::Variable {
                name: name.to_string(),
            });
        }
    }
}

impl FunctionContext for MapContext {
    fn resolve(&self, name: &str, tracker: &mut Tracker) -> FunctionOutcome<Value> {
        if self.disposed.get() {
            return Err(FunctionError::disposed());
        }
        tracker.depend_on(&self.listener_list(name));
        self.get(name)
            .ok_or_else(|| FunctionError::undefined_variable(name))
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let lists: Vec<Rc<ListenerList>> =
            self.listeners.borrow_mut().drain().map(|(_, l)| l).collect();
        for list in lists {
            list.notify(&Event::Disposed);
            list.clear();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}
