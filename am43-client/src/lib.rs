//! AM43 blind motor client
//!
//! This crate provides the polling and command engine for a single motor:
//! - [`Am43Client`]: connection handling, login and telemetry polling,
//!   motor commands
//! - [`ClientConfig`] / [`ClientBuilder`]: per-device settings
//! - [`DeviceFilter`]: allow/deny list a bridge uses to pick its devices

pub mod config;
pub mod engine;
pub mod filter;

pub use config::{ClientBuilder, ClientConfig, LEGACY_POLL_INTERVAL_MS};
pub use engine::Am43Client;
pub use filter::DeviceFilter;
