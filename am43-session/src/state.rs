//! Link state machine

/// Connection and authentication state of one motor
///
/// # State Transitions
/// ```text
/// Disconnected  --TransportUp-->    Connected
/// Connected     --LoginAccepted-->  Authenticated
/// Authenticated --LoginRejected-->  Connected
/// Connected     --TransportDown-->  Disconnected
/// Authenticated --TransportDown-->  Disconnected
/// any           --ConnectFailed-->  Disconnected
/// ```
///
/// Every other (state, event) pair is ignored. `Authenticated` implies the
/// link is up, so "logged in but disconnected" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum LinkState {
    /// No link (initial state)
    #[default]
    Disconnected,
    /// Link up, PIN not yet accepted
    Connected,
    /// Link up and PIN accepted; telemetry polling runs
    Authenticated,
}

/// Input to the link state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Transport reported a successful connection
    TransportUp,
    /// LOGIN acknowledged
    LoginAccepted,
    /// LOGIN rejected
    LoginRejected,
    /// Transport dropped an established link
    TransportDown,
    /// A connection attempt failed
    ConnectFailed,
}

impl LinkState {
    /// Look up the transition for `event`
    ///
    /// # Returns
    /// The next state, or `None` if the event has no effect in this state.
    /// `ConnectFailed` always yields `Disconnected`, including from
    /// `Disconnected` itself, so a failed attempt is reported like a dropped
    /// link. A `TransportDown` on a link that is already down is ignored.
    pub fn transition(self, event: LinkEvent) -> Option<LinkState> {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (Disconnected, TransportUp) => Some(Connected),
            (Connected, LoginAccepted) => Some(Authenticated),
            (Connected, LoginRejected) => Some(Connected),
            (Authenticated, LoginRejected) => Some(Connected),
            (Authenticated, LoginAccepted) => Some(Authenticated),
            (Connected | Authenticated, TransportDown) => Some(Disconnected),
            (Disconnected, TransportDown) => None,
            (_, ConnectFailed) => Some(Disconnected),
            (Connected | Authenticated, TransportUp) => None,
            (Disconnected, LoginAccepted | LoginRejected) => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, LinkState::Disconnected)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, LinkState::Authenticated)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "Disconnected",
            LinkState::Connected => "Connected",
            LinkState::Authenticated => "Authenticated",
        }
    }
}
