//! Transport layer module for the AM43 protocol
//!
//! The radio link (discovery, connection, characteristic writes and
//! notification subscription) lives outside this workspace. This crate
//! defines the contract such a link must satisfy, the event channel it uses to
//! hand inbound data to the protocol engine, and an in-memory implementation.

pub mod channel;
pub mod event;
pub mod transport;

pub use am43_core::{Am43Error, Am43Result};
pub use channel::{ChannelTransport, DevicePeer};
pub use event::{EventSink, EventStream, TransportEvent, event_channel};
pub use transport::Transport;
