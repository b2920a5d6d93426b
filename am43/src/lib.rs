//! am43 - Rust client for AM43 blind motors
//!
//! AM43 motors are driven over a BLE characteristic with a small proprietary
//! frame format. This library implements the protocol engine; the radio link
//! is supplied by the host through the [`Transport`] trait.
//!
//! # Architecture
//!
//! - `am43-core`: error type and protocol constants
//! - `am43-transport`: transport trait, inbound event channel, in-memory link
//! - `am43-session`: framing, reply parsing, session state, dispatch
//! - `am43-client`: polling and command engine, configuration
//!
//! # Usage
//!
//! ```no_run
//! use am43::{ChannelTransport, ClientBuilder};
//! use std::time::Instant;
//!
//! # async fn demo() -> am43::Am43Result<()> {
//! let (transport, _peer) = ChannelTransport::pair();
//! let mut client = ClientBuilder::new()
//!     .device("Living room", "02:AB:CD:EF:01:23")
//!     .build(transport)?;
//! client.connect().await?;
//! client.tick(Instant::now()).await?;
//! client.set_position(40).await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use am43_core::constants;
pub use am43_core::{Am43Error, Am43Result};

// Re-export transport API
pub use am43_transport::{ChannelTransport, DevicePeer, EventSink, Transport, TransportEvent};

// Re-export session layer
pub mod session {
    pub use am43_session::*;
}

pub use am43_session::{
    DeviceId, DeviceSettings, LinkState, LinkStatistics, SessionListener, SessionState,
};

// Re-export client API
pub mod client {
    pub use am43_client::*;
}

pub use am43_client::{Am43Client, ClientBuilder, ClientConfig, DeviceFilter};
