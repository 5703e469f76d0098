//! Listener plumbing shared by every herald.
//!
//! The whole system is single-threaded event dispatch, so subscriptions are
//! plain `Rc` callbacks. A [`ListenerHandle`] detaches its subscription
//! exactly once, either explicitly via [`ListenerHandle::unlisten`] or on
//! drop, and is safe to release after the source signal is gone.

mod property;

pub use property::{Property, PropertyChange, PropertyListener};

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Callback<E> = Rc<dyn Fn(&E)>;

struct SignalInner<E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Callback<E>)>>,
}

/// A broadcast signal with dynamically attached listeners.
///
/// Emission snapshots the listener list first, so listeners may attach or
/// detach other listeners (including themselves) during dispatch without
/// invalidating the iteration.
pub struct Signal<E> {
    inner: Rc<SignalInner<E>>,
}

impl<E> Clone for Signal<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Signal<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Attaches a listener; the returned handle undoes exactly this
    /// subscription.
    pub fn listen<F: Fn(&E) + 'static>(&self, callback: F) -> ListenerHandle
    where
        E: 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(callback)));

        let weak: Weak<SignalInner<E>> = Rc::downgrade(&self.inner);
        ListenerHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    /// Synchronously invokes every attached listener.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }

    /// Number of currently attached listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

/// A disposable handle that undoes one subscription.
///
/// Detaching is idempotent; dropping the handle detaches implicitly, so a
/// cache item can release all of its subscriptions by dropping its handle
/// vector.
pub struct ListenerHandle {
    detach: Option<Box<dyn FnOnce()>>,
}

impl ListenerHandle {
    fn new<F: FnOnce() + 'static>(detach: F) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detaches the subscription; subsequent calls are no-ops.
    pub fn unlisten(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Whether the subscription is still attached
    pub fn is_attached(&self) -> bool {
        self.detach.is_some()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.unlisten();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_and_emit() {
        let signal: Signal<i32> = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = Rc::clone(&seen);
        let _handle = signal.listen(move |value| seen_clone.borrow_mut().push(*value));

        signal.emit(&1);
        signal.emit(&2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unlisten_detaches_exactly_once() {
        let signal: Signal<()> = Signal::new();
        let count = Rc::new(Cell::new(0));

        let count_clone = Rc::clone(&count);
        let mut handle = signal.listen(move |_| count_clone.set(count_clone.get() + 1));
        assert_eq!(signal.listener_count(), 1);

        handle.unlisten();
        handle.unlisten();
        assert_eq!(signal.listener_count(), 0);
        assert!(!handle.is_attached());

        signal.emit(&());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let signal: Signal<()> = Signal::new();
        {
            let _handle = signal.listen(|_| {});
            assert_eq!(signal.listener_count(), 1);
        }
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_unlisten_after_signal_dropped_is_safe() {
        let signal: Signal<()> = Signal::new();
        let mut handle = signal.listen(|_| {});
        drop(signal);
        handle.unlisten();
    }

    #[test]
    fn test_listener_may_detach_during_dispatch() {
        let signal: Signal<()> = Signal::new();
        let handle: Rc<RefCell<Option<ListenerHandle>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(Cell::new(0));

        let handle_clone = Rc::clone(&handle);
        let count_clone = Rc::clone(&count);
        *handle.borrow_mut() = Some(signal.listen(move |_| {
            count_clone.set(count_clone.get() + 1);
            if let Some(h) = handle_clone.borrow_mut().as_mut() {
                h.unlisten();
            }
        }));

        signal.emit(&());
        signal.emit(&());
        assert_eq!(count.get(), 1);
    }
}
