//! Session layer module for the AM43 protocol
//!
//! This crate holds everything between raw bytes and the polling engine:
//! - frame encoding and checksum ([`frame`], [`command`])
//! - typed parsing of inbound notifications ([`reply`])
//! - per-device state and the link state machine ([`session`], [`state`])
//! - observer registration ([`listener`])
//! - interpretation of replies against the session ([`dispatcher`])
//! - link counters ([`statistics`])

pub mod command;
pub mod dispatcher;
pub mod frame;
pub mod listener;
pub mod reply;
pub mod session;
pub mod state;
pub mod statistics;

pub use am43_core::{Am43Error, Am43Result};
pub use command::{Command, MoveDirection, TelemetryQuery};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use frame::{FrameView, checksum, decode, encode, to_hex};
pub use listener::{ListenerSlot, SessionListener};
pub use reply::{Ack, ConfigFlags, DeviceSettings, Reply};
pub use session::{DeviceId, SessionState};
pub use state::{LinkEvent, LinkState};
pub use statistics::LinkStatistics;
