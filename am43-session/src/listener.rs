//! Observer callbacks
//!
//! The bridge layer observes a session through a [`SessionListener`]. The
//! session never owns its listener: it keeps a weak reference in a
//! [`ListenerSlot`], so dropping the listener silently stops the callbacks,
//! and closing the slot at teardown guarantees no callback runs afterwards.

use crate::session::SessionState;
use std::fmt;
use std::sync::{Arc, Weak};

/// Callbacks raised by a session
///
/// All methods default to doing nothing. They run on the engine's task, in
/// the middle of a tick, and must not block.
pub trait SessionListener: Send + Sync {
    /// The link came up (PIN not yet verified)
    fn on_connect(&self, _session: &SessionState) {}

    /// The link dropped or a connection attempt failed
    fn on_disconnect(&self, _session: &SessionState) {}

    /// New position in percent closed
    fn on_position(&self, _level: u8) {}

    /// New battery level in percent
    fn on_battery_level(&self, _level: u8) {}

    /// New light sensor reading
    fn on_light_level(&self, _level: u8) {}
}

/// Registration of at most one listener
#[derive(Default)]
pub struct ListenerSlot {
    listener: Option<Weak<dyn SessionListener>>,
    closed: bool,
}

impl fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("registered", &self.is_registered())
            .field("closed", &self.closed)
            .finish()
    }
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, replacing any previous one
    ///
    /// Ignored once the slot is closed.
    pub fn register(&mut self, listener: &Arc<dyn SessionListener>) {
        if !self.closed {
            self.listener = Some(Arc::downgrade(listener));
        }
    }

    /// Remove the current listener
    pub fn unregister(&mut self) {
        self.listener = None;
    }

    /// Drop the listener and refuse further registrations
    ///
    /// Idempotent.
    pub fn close(&mut self) {
        self.listener = None;
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a live listener is registered
    pub fn is_registered(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Run `f` against the listener if one is registered and still alive
    pub fn notify<F>(&self, f: F)
    where
        F: FnOnce(&dyn SessionListener),
    {
        if self.closed {
            return;
        }
        if let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) {
            f(listener.as_ref());
        }
    }
}
