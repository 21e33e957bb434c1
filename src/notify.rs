//! Change-notification broker.
//!
//! The backend raises its own internal "saved" signal on every native
//! save call, and one logical upsert saves the primary record, the
//! location and the term bindings separately. Without filtering, a host
//! listener would hear five saves for one event. The reconciler therefore
//! opens a suppression window around the whole write and fires exactly
//! one notification itself once the window closes.

use std::cell::{Cell, RefCell};

/// Kinds of change notifications delivered to host listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Saved,
    Deleted,
}

/// Listener invoked with a backend-native event id.
pub type Listener = Box<dyn Fn(i64)>;

/// Per-adapter listener registry with a reentrancy guard.
#[derive(Default)]
pub struct NotificationBroker {
    saved: RefCell<Vec<Listener>>,
    deleted: RefCell<Vec<Listener>>,
    suppressed: Cell<bool>,
    saved_hook_wired: Cell<bool>,
    deleted_hook_wired: Cell<bool>,
}

impl NotificationBroker {
    pub fn new() -> Self {
        NotificationBroker::default()
    }

    /// Register a listener. Duplicate listeners are allowed; the host
    /// distinguishes them, not the broker.
    pub fn subscribe(&self, kind: NotifyKind, listener: Listener) {
        self.listeners(kind).borrow_mut().push(listener);
    }

    /// Returns true the first time it is called for `kind`. Callers use
    /// this to wire the underlying backend hook at most once, however
    /// often `subscribe` runs.
    pub fn mark_hook_wired(&self, kind: NotifyKind) -> bool {
        let wired = match kind {
            NotifyKind::Saved => &self.saved_hook_wired,
            NotifyKind::Deleted => &self.deleted_hook_wired,
        };
        !wired.replace(true)
    }

    /// Invoke all listeners for `kind` in registration order, unless a
    /// suppression window is open.
    pub fn fire(&self, kind: NotifyKind, event_id: i64) {
        if self.suppressed.get() {
            return;
        }
        for listener in self.listeners(kind).borrow().iter() {
            listener(event_id);
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.get()
    }

    /// Open a suppression window. The returned guard restores the previous
    /// state when dropped, on every exit path.
    pub fn suppress(&self) -> SuppressGuard<'_> {
        let previous = self.suppressed.replace(true);
        SuppressGuard {
            broker: self,
            previous,
        }
    }

    fn listeners(&self, kind: NotifyKind) -> &RefCell<Vec<Listener>> {
        match kind {
            NotifyKind::Saved => &self.saved,
            NotifyKind::Deleted => &self.deleted,
        }
    }
}

/// Owned suppression token; dropping it closes the window.
pub struct SuppressGuard<'a> {
    broker: &'a NotificationBroker,
    previous: bool,
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.broker.suppressed.set(self.previous);
    }
}
