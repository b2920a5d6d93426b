//! Transport trait consumed by the protocol engine

use crate::event::EventSink;
use am43_core::Am43Result;
use async_trait::async_trait;

/// Link to a single motor
///
/// Implementations wrap a radio stack: they establish the link to the motor,
/// write frames to its characteristic and forward notifications.
///
/// # Event Delivery
/// The engine calls [`attach`](Transport::attach) once, before anything else.
/// From then on the transport reports everything the engine did not ask for
/// through the sink:
/// - notification buffers, exactly as received
/// - link loss
/// - connection results of attempts the stack made on its own
///
/// Pushing into the sink never blocks, so it is safe to call from radio-stack
/// callbacks running on another thread.
///
/// # Sending
/// [`send`](Transport::send) hands one complete frame to the stack and returns
/// as soon as it has been written. It must not wait for a reply.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Register the sink inbound events are pushed into
    fn attach(&mut self, sink: EventSink);

    /// Establish the link and subscribe to notifications
    ///
    /// # Errors
    /// Returns error if the motor cannot be reached or does not expose the
    /// expected characteristic
    async fn connect(&mut self) -> Am43Result<()>;

    /// Write one frame to the characteristic
    async fn send(&mut self, frame: &[u8]) -> Am43Result<()>;

    /// Tear the link down
    ///
    /// Calling this on a link that is already down is not an error.
    async fn disconnect(&mut self) -> Am43Result<()>;

    /// Check whether the link is currently up
    fn is_connected(&self) -> bool;
}
