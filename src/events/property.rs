//! Observable properties and the nested re-subscription listener.

use super::{ListenerHandle, Signal};
use std::cell::RefCell;
use std::rc::Rc;

/// Change notification carrying the new and previous value
#[derive(Debug, Clone)]
pub struct PropertyChange<T> {
    pub new: T,
    pub old: T,
}

struct PropertyInner<T> {
    value: RefCell<T>,
    changed: Signal<PropertyChange<T>>,
}

/// A single observable value: get the current value, set it, or subscribe
/// to replacements. Every `set` emits, mirroring engines that notify on
/// assignment rather than on inequality.
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                value: RefCell::new(value),
                changed: Signal::new(),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replaces the value and notifies listeners with (new, old).
    ///
    /// The value borrow is released before dispatch, so listeners may read
    /// or even set the property again.
    pub fn set(&self, value: T) {
        let old = {
            let mut slot = self.inner.value.borrow_mut();
            std::mem::replace(&mut *slot, value.clone())
        };
        self.inner.changed.emit(&PropertyChange { new: value, old });
    }

    /// Subscribes to replacements of the value
    pub fn listen<F: Fn(&PropertyChange<T>) + 'static>(&self, callback: F) -> ListenerHandle {
        self.inner.changed.listen(callback)
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.inner.changed.listener_count()
    }
}

/// Re-subscribes to a nested observable whenever the parent property is
/// replaced.
///
/// On construction the rewire callback runs immediately with the current
/// value (old = `None`) and returns the subscriptions tied to that value.
/// On every later replacement the previous subscriptions are dropped first,
/// then the callback runs with (new, old) and its fresh handles are stored.
/// This is what lets "the view object was swapped" rewire resolution
/// tracking onto the new view without bookkeeping at every call site.
///
/// If the callback panics the listener is left partially wired; the panic
/// propagates, since partial subscription state is worse than a crash.
pub struct PropertyListener {
    outer: ListenerHandle,
    children: Rc<RefCell<Vec<ListenerHandle>>>,
}

impl PropertyListener {
    pub fn new<T, F>(property: &Property<T>, rewire: F) -> Self
    where
        T: Clone + 'static,
        F: Fn(&T, Option<&T>) -> Vec<ListenerHandle> + 'static,
    {
        let children = Rc::new(RefCell::new(Vec::new()));
        let initial = rewire(&property.get(), None);
        *children.borrow_mut() = initial;

        let children_for_cb = Rc::clone(&children);
        let outer = property.listen(move |change: &PropertyChange<T>| {
            // Drop the previous value's subscriptions before rewiring.
            children_for_cb.borrow_mut().clear();
            let fresh = rewire(&change.new, Some(&change.old));
            *children_for_cb.borrow_mut() = fresh;
        });

        Self { outer, children }
    }

    /// Detaches the outer subscription and all current child subscriptions
    pub fn unlisten(&mut self) {
        self.outer.unlisten();
        self.children.borrow_mut().clear();
    }
}

impl Drop for PropertyListener {
    fn drop(&mut self) {
        self.unlisten();
    }
}
