//! Per-device session state

use crate::command::TelemetryQuery;
use crate::reply::DeviceSettings;
use crate::state::{LinkEvent, LinkState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Identity of one motor, used to label log output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    pub address: String,
}

impl DeviceId {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.address)
    }
}

/// Connection, authentication and telemetry state of one motor
///
/// The session is owned by the polling engine. Only the engine and the
/// dispatcher mutate it, both on the engine's task; everything else gets
/// read access. Telemetry fields are `None` until the first successful read.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    device: DeviceId,
    link: LinkState,
    /// Set on the first link loss or failed connection; never cleared
    disconnected: bool,
    pin: u16,
    battery_percent: Option<u8>,
    open_level: Option<u8>,
    light_level: Option<u8>,
    settings: Option<DeviceSettings>,
    query: TelemetryQuery,
    #[serde(skip)]
    last_poll: Option<Instant>,
}

impl SessionState {
    pub fn new(device: DeviceId, pin: u16) -> Self {
        Self {
            device,
            link: LinkState::Disconnected,
            disconnected: false,
            pin,
            battery_percent: None,
            open_level: None,
            light_level: None,
            settings: None,
            query: TelemetryQuery::default(),
            last_poll: None,
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn is_logged_in(&self) -> bool {
        self.link.is_authenticated()
    }

    /// Whether the link has dropped (or failed) at least once
    pub fn was_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn pin(&self) -> u16 {
        self.pin
    }

    pub fn battery_percent(&self) -> Option<u8> {
        self.battery_percent
    }

    /// Latest position in percent closed (0 = open, 100 = closed)
    pub fn open_level(&self) -> Option<u8> {
        self.open_level
    }

    pub fn light_level(&self) -> Option<u8> {
        self.light_level
    }

    pub fn settings(&self) -> Option<&DeviceSettings> {
        self.settings.as_ref()
    }

    /// Telemetry request the next authenticated poll sends
    pub fn next_query(&self) -> TelemetryQuery {
        self.query
    }

    /// Round-robin cursor in `0..3`
    pub fn query_cursor(&self) -> u8 {
        self.query.cursor()
    }

    pub fn last_poll(&self) -> Option<Instant> {
        self.last_poll
    }

    /// Apply a link event
    ///
    /// Entering `Connected` from `Disconnected` resets the polling cursor and
    /// clears the poll timestamp so the first tick logs in straight away.
    /// Entering `Disconnected` sets the sticky disconnected flag.
    ///
    /// # Returns
    /// The state before and after the event, or `None` if the event was
    /// ignored in the current state
    pub fn apply(&mut self, event: LinkEvent) -> Option<(LinkState, LinkState)> {
        let from = self.link;
        let to = from.transition(event)?;

        match (from, to) {
            (LinkState::Disconnected, LinkState::Connected) => {
                self.query = TelemetryQuery::default();
                self.last_poll = None;
            }
            (_, LinkState::Disconnected) => {
                self.disconnected = true;
            }
            _ => {}
        }
        self.link = to;
        Some((from, to))
    }

    pub fn set_pin(&mut self, pin: u16) {
        self.pin = pin;
    }

    pub fn set_battery_percent(&mut self, level: u8) {
        self.battery_percent = Some(level);
    }

    pub fn set_open_level(&mut self, level: u8) {
        self.open_level = Some(level);
    }

    pub fn set_light_level(&mut self, level: u8) {
        self.light_level = Some(level);
    }

    pub fn set_settings(&mut self, settings: DeviceSettings) {
        self.settings = Some(settings);
    }

    /// Record that a poll (login or telemetry) went out at `now`
    pub fn mark_polled(&mut self, now: Instant) {
        self.last_poll = Some(now);
    }

    /// Move the poll timestamp so the next poll is due at `due`, unless it is
    /// already due earlier
    pub fn pull_next_poll(&mut self, due: Instant, interval: std::time::Duration) {
        let Some(rebased) = due.checked_sub(interval) else {
            return;
        };
        if let Some(last) = self.last_poll {
            if last > rebased {
                self.last_poll = Some(rebased);
            }
        }
    }

    /// Step the round-robin cursor
    ///
    /// Has no effect unless the session is authenticated.
    pub fn advance_query(&mut self) {
        if self.link.is_authenticated() {
            self.query = self.query.next();
        }
    }

    /// Whether a poll is due at `now`
    pub fn poll_due(&self, now: Instant, interval: std::time::Duration) -> bool {
        match self.last_poll {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        }
    }
}
