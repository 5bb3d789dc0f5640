//! Cached, invalidatable results of compiled functions
//!
//! A result computes on the first read after creation or invalidation and
//! then subscribes to exactly the listener lists its computation read. Any
//! event on one of them drops the cached outcome and tells the result's own
//! listeners (the parent result, or an outside observer) once.

use super::context::{ContextRef, Tracker};
use super::error::FunctionError;
use super::function::Function;
use super::status::Status;
use super::value::Value;
use crate::observe::{Event, Listener, ListenerList, Subscription};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Value and status of one computation
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    pub status: Status,
}

impl Outcome {
    pub fn ok(value: Value) -> Self {
        Outcome {
            value,
            status: Status::ok(),
        }
    }

    pub fn failed(error: FunctionError) -> Self {
        Outcome {
            value: Value::Null,
            status: Status::error(error.message),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status.is_ok() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}", self.status)
        }
    }
}

/// Handle to the evaluation of one function node against one context
pub struct FunctionResult(Rc<ResultNode>);

struct ResultNode {
    this: Weak<ResultNode>,
    function: Rc<Function>,
    context: ContextRef,
    operands: Vec<FunctionResult>,
    listeners: Rc<ListenerList>,
    state: RefCell<ResultState>,
}

#[derive(Default)]
struct ResultState {
    outcome: Option<Rc<Outcome>>,
    subscriptions: Vec<Subscription>,
    operand_subscriptions: Vec<Subscription>,
    evaluating: bool,
    disposed: bool,
    evaluations: usize,
    invalidations: usize,
}

impl FunctionResult {
    pub(crate) fn new(function: Rc<Function>, context: &ContextRef) -> Self {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let operands: Vec<FunctionResult> = function
                .operands()
                .iter()
                .map(|operand| operand.evaluate(context))
                .collect();
            let node = Rc::new_cyclic(|this| ResultNode {
                this: this.clone(),
                function,
                context: Rc::clone(context),
                operands,
                listeners: ListenerList::new(),
                state: RefCell::new(ResultState::default()),
            });
            let operand_subscriptions = node
                .operands
                .iter()
                .map(|operand| operand.0.listeners.attach(node.listener()))
                .collect();
            node.state.borrow_mut().operand_subscriptions = operand_subscriptions;
            FunctionResult(node)
        })
    }

    /// Cached outcome, computed if needed. Reads between invalidations
    /// return the same `Rc`.
    pub fn outcome(&self) -> Rc<Outcome> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.0.outcome())
    }

    pub fn value(&self) -> Value {
        self.outcome().value.clone()
    }

    pub fn status(&self) -> Status {
        self.outcome().status.clone()
    }

    /// Drop the cached outcome and notify listeners. No-op when nothing is
    /// cached.
    pub fn invalidate(&self) {
        self.0.invalidate();
    }

    /// Detach from every source and dispose the operand results. Reads
    /// afterwards report the disposed error.
    pub fn dispose(&self) {
        self.0.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.0.state.borrow().disposed
    }

    /// Observe invalidation and disposal of this result
    #[must_use = "a subscription that is never detached keeps its listener alive"]
    pub fn attach(&self, listener: Listener) -> Subscription {
        self.0.listeners.attach(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.0.listeners.len()
    }

    /// Number of completed computations
    pub fn evaluation_count(&self) -> usize {
        self.0.state.borrow().evaluations
    }

    pub fn invalidation_count(&self) -> usize {
        self.0.state.borrow().invalidations
    }

    /// Sources the last computation subscribed to
    pub fn dependency_count(&self) -> usize {
        self.0.state.borrow().subscriptions.len()
    }

    pub fn is_cached(&self) -> bool {
        self.0.state.borrow().outcome.is_some()
    }

    pub fn function(&self) -> &Rc<Function> {
        &self.0.function
    }

    pub fn context(&self) -> &ContextRef {
        &self.0.context
    }

    pub fn operands(&self) -> &[FunctionResult] {
        &self.0.operands
    }
}

impl ResultNode {
    fn listener(&self) -> Listener {
        let node = self.this.clone();
        Rc::new(move |event: &Event| {
            if let Some(node) = node.upgrade() {
                debug!(function = %node.function.name(), ?event, "dependency changed");
                node.invalidate();
            }
        })
    }

    fn outcome(&self) -> Rc<Outcome> {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return Rc::new(Outcome::failed(FunctionError::disposed()));
            }
            if let Some(outcome) = &state.outcome {
                return Rc::clone(outcome);
            }
            if state.evaluating {
                return Rc::new(Outcome::failed(FunctionError::cycle(&self.function.name())));
            }
            state.evaluating = true;
        }

        if self.context.is_disposed() {
            self.state.borrow_mut().evaluating = false;
            return Rc::new(Outcome::failed(FunctionError::disposed()));
        }

        let mut tracker = Tracker::default();
        let outcome = match self
            .function
            .compute(&self.operands, &self.context, &mut tracker)
        {
            Ok(value) => Outcome::ok(value),
            Err(error) => Outcome::failed(error),
        };
        let outcome = Rc::new(outcome);
        let subscriptions: Vec<Subscription> = tracker
            .into_sources()
            .iter()
            .map(|source| source.attach(self.listener()))
            .collect();
        debug!(
            function = %self.function.name(),
            dependencies = subscriptions.len(),
            status = %outcome.status.severity,
            "computed function result"
        );

        let mut state = self.state.borrow_mut();
        state.evaluating = false;
        state.evaluations += 1;
        if state.disposed {
            drop(state);
            for subscription in subscriptions {
                subscription.detach();
            }
            return outcome;
        }
        state.subscriptions = subscriptions;
        state.outcome = Some(Rc::clone(&outcome));
        outcome
    }

    fn invalidate(&self) {
        let subscriptions = {
            let mut state = self.state.borrow_mut();
            if state.disposed || state.outcome.is_none() {
                return;
            }
            state.outcome = None;
            state.invalidations += 1;
            std::mem::take(&mut state.subscriptions)
        };
        for subscription in subscriptions {
            subscription.detach();
        }
        debug!(function = %self.function.name(), "invalidated function result");
        self.listeners.notify(&Event::Invalidated);
    }

    fn dispose(&self) {
        let subscriptions = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.outcome = None;
            let mut subscriptions = std::mem::take(&mut state.subscriptions);
            subscriptions.append(&mut state.operand_subscriptions);
            subscriptions
        };
        for subscription in subscriptions {
            subscription.detach();
        }
        for operand in &self.operands {
            operand.0.dispose();
        }
        self.listeners.notify(&Event::Disposed);
        self.listeners.clear();
    }
}

impl Drop for ResultNode {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for FunctionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("FunctionResult")
            .field("function", &self.0.function.name())
            .field("outcome", &state.outcome)
            .field("disposed", &state.disposed)
            .finish()
    }
}
