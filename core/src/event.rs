//! Synchronous publish/subscribe primitive used for both domain
//! notifications and command scheduling.
//!
//! An [`Event`] owns an ordered list of listeners. Listener identity is
//! `Rc` pointer identity, which gives set-like subscribe semantics and lets
//! a suspended command unsubscribe exactly the handle it registered.
//! `notify` iterates a snapshot of the list taken at invocation time, so a
//! listener that unsubscribes itself (or interrupts a chain that
//! unsubscribes others) never corrupts the pass in progress.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a callable listener invoked with the event payload.
pub type Listener<T> = Rc<dyn Fn(&T)>;

/// Ordered, mutation-safe collection of listeners for one notification.
pub struct Event<T> {
    listeners: RefCell<Vec<Listener<T>>>,
}

impl<T> Event<T> {
    /// Creates an event with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Adds the listener unless the same handle is already subscribed.
    ///
    /// Listeners are invoked in subscription order. A listener subscribed
    /// while a `notify` pass is running does not receive that pass.
    pub fn subscribe(&self, listener: &Listener<T>) {
        let mut listeners = self.listeners.borrow_mut();
        if !listeners
            .iter()
            .any(|existing| Rc::ptr_eq(existing, listener))
        {
            listeners.push(Rc::clone(listener));
        }
    }

    /// Removes the listener, reporting whether it was subscribed.
    ///
    /// Unsubscribing a listener that is not present is not an error. A
    /// listener removed while a `notify` pass is running still receives
    /// that pass.
    pub fn unsubscribe(&self, listener: &Listener<T>) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners
            .iter()
            .position(|existing| Rc::ptr_eq(existing, listener))
        {
            Some(index) => {
                let _ = listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invokes every currently-subscribed listener with the payload.
    ///
    /// The subscriber list is snapshotted before iteration; listener panics
    /// propagate to the caller and abort the remaining notifications.
    pub fn notify(&self, payload: &T) {
        let snapshot: Vec<Listener<T>> = self.listeners.borrow().clone();
        for listener in snapshot {
            listener(payload);
        }
    }

    /// Number of listeners currently subscribed.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
