//! Listener lists shared by model properties, host variables and function
//! results

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Something a listener is told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Content of a property was written, inserted into or removed from
    PropertyContent { property: String },
    /// A property must be re-validated or re-checked for enablement
    PropertyRefresh { property: String },
    /// A host variable was set or removed
    Variable { name: String },
    /// A cached function result was invalidated
    Invalidated,
    /// The source is being disposed and drops all listeners
    Disposed,
}

/// Callback invoked on every event of the list it is attached to
pub type Listener = Rc<dyn Fn(&Event)>;

/// Identifies one attachment within a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

/// Ordered set of listeners
#[derive(Default)]
pub struct ListenerList {
    next: Cell<u64>,
    entries: RefCell<Vec<(ListenerKey, Listener)>>,
}

impl ListenerList {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Attach a listener. It stays attached until the returned subscription
    /// is detached or the list is cleared; dropping the subscription does
    /// not detach it.
    #[must_use = "a subscription that is never detached keeps its listener alive"]
    pub fn attach(self: &Rc<Self>, listener: Listener) -> Subscription {
        let key = ListenerKey(self.next.get());
        self.next.set(key.0 + 1);
        self.entries.borrow_mut().push((key, listener));
        Subscription {
            list: Rc::downgrade(self),
            key,
        }
    }

    pub fn detach(&self, key: ListenerKey) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(k, _)| *k != key);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Deliver an event. Listeners are snapshotted first, so a listener may
    /// attach or detach while being notified.
    pub fn notify(&self, event: &Event) {
        let snapshot: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl std::fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle to one attachment
#[derive(Debug)]
pub struct Subscription {
    list: Weak<ListenerList>,
    key: ListenerKey,
}

impl Subscription {
    /// Remove the listener. Returns false when the list is gone or the
    /// listener was already removed.
    pub fn detach(self) -> bool {
        match self.list.upgrade() {
            Some(list) => list.detach(self.key),
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.list
            .upgrade()
            .is_some_and(|list| list.entries.borrow().iter().any(|(k, _)| *k == self.key))
    }
}
