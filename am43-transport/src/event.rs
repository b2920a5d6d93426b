//! Inbound transport events
//!
//! Radio stacks deliver notifications and link-loss callbacks on their own
//! execution context. Those callbacks only push a [`TransportEvent`] into an
//! unbounded channel; the protocol engine is the single consumer and applies
//! every event on its own task.

use bytes::Bytes;
use std::fmt;
use tokio::sync::mpsc;

/// Event raised by a transport outside of a direct call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link came up without the engine asking (e.g. stack-level reconnect)
    Connected,
    /// A connection attempt started by the stack failed
    ConnectFailed(String),
    /// Raw bytes received on the notify characteristic
    Notify(Bytes),
    /// The link dropped
    Disconnected,
}

/// Sending half handed to the transport
///
/// Cheap to clone and usable from synchronous callbacks.
#[derive(Clone)]
pub struct EventSink {
    sender: mpsc::UnboundedSender<TransportEvent>,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl EventSink {
    /// Push an event
    ///
    /// # Returns
    /// `false` if the consumer has gone away (session torn down)
    pub fn push(&self, event: TransportEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Forward a notification buffer
    pub fn notify(&self, data: &[u8]) -> bool {
        self.push(TransportEvent::Notify(Bytes::copy_from_slice(data)))
    }

    pub fn connected(&self) -> bool {
        self.push(TransportEvent::Connected)
    }

    pub fn connect_failed(&self, reason: impl Into<String>) -> bool {
        self.push(TransportEvent::ConnectFailed(reason.into()))
    }

    pub fn disconnected(&self) -> bool {
        self.push(TransportEvent::Disconnected)
    }

    /// Check whether the consumer has been dropped or closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving half owned by the protocol engine
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<TransportEvent>,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish()
    }
}

impl EventStream {
    /// Take every event queued so far without waiting
    pub fn drain(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event
    ///
    /// Returns `None` once every sink is dropped or the stream is closed.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.receiver.recv().await
    }

    /// Stop accepting events and discard anything still queued
    ///
    /// Subsequent pushes from the transport fail silently.
    pub fn close(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Create a connected sink/stream pair
pub fn event_channel() -> (EventSink, EventStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventSink { sender }, EventStream { receiver })
}
