//! Client configuration and builder
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use am43_client::ClientBuilder;
//! use am43_transport::ChannelTransport;
//! use std::time::Duration;
//!
//! let (transport, _peer) = ChannelTransport::pair();
//! let client = ClientBuilder::new()
//!     .device("Living room", "02:AB:CD:EF:01:23")
//!     .pin(1234)
//!     .poll_interval(Duration::from_secs(60))
//!     .build(transport)?;
//! # Ok::<(), am43_core::Am43Error>(())
//! ```

use crate::engine::Am43Client;
use am43_core::constants::{DEFAULT_LOGIN_SETTLE_MS, DEFAULT_PIN, DEFAULT_POLL_INTERVAL_MS};
use am43_core::{Am43Error, Am43Result};
use am43_session::{DeviceId, SessionListener};
use am43_transport::Transport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Poll interval used by the first driver revision
pub const LEGACY_POLL_INTERVAL_MS: u64 = 120_000;

/// Per-device client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// PIN sent in the LOGIN frame
    pub pin: u16,
    /// Time between two polls (login attempts or telemetry requests)
    pub poll_interval_ms: u64,
    /// Upper bound on the delay between a LOGIN ack and the first telemetry poll
    pub login_settle_ms: u64,
    /// Label used in log output
    pub device: DeviceId,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            login_settle_ms: DEFAULT_LOGIN_SETTLE_MS,
            device: DeviceId::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with the slower poll interval of the first driver revision
    pub fn legacy() -> Self {
        Self {
            poll_interval_ms: LEGACY_POLL_INTERVAL_MS,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    /// Check the settings before a client is built from them
    ///
    /// # Errors
    /// Returns `Am43Error::InvalidConfig` for a zero poll interval
    pub fn validate(&self) -> Am43Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Am43Error::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`Am43Client`]
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    listener: Option<Arc<dyn SessionListener>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            listener: None,
        }
    }

    pub fn pin(mut self, pin: u16) -> Self {
        self.config.pin = pin;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn login_settle(mut self, settle: Duration) -> Self {
        self.config.login_settle_ms = u64::try_from(settle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn device(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.config.device = DeviceId::new(name, address);
        self
    }

    /// Register a listener
    ///
    /// The client only keeps a weak reference; the caller must hold on to
    /// the `Arc` for callbacks to keep arriving.
    pub fn listener(mut self, listener: &Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener.clone());
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create the client
    ///
    /// # Errors
    /// Returns `Am43Error::InvalidConfig` if the configuration is invalid
    pub fn build<T: Transport>(self, transport: T) -> Am43Result<Am43Client<T>> {
        self.config.validate()?;
        let mut client = Am43Client::new(transport, self.config);
        if let Some(listener) = self.listener.as_ref() {
            client.set_listener(listener);
        }
        Ok(client)
    }
}
