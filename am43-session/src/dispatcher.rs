//! Notification dispatcher
//!
//! Inbound events are queued by the transport and drained by the engine. The
//! dispatcher turns each notification into a [`Reply`], applies it to the
//! session and raises the matching listener callback.

use crate::frame::{self, to_hex};
use crate::listener::ListenerSlot;
use crate::reply::{Ack, Reply};
use crate::session::SessionState;
use crate::state::LinkEvent;
use crate::statistics::LinkStatistics;
use am43_transport::{EventStream, TransportEvent};

/// What a reply did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A telemetry value was stored and reported
    Telemetry,
    /// LOGIN acknowledged; the session is now authenticated
    LoginAccepted,
    /// LOGIN rejected; the session is no longer authenticated
    LoginRejected,
    /// A command was acknowledged
    Acknowledged,
    /// A command was rejected
    Rejected,
    /// Nothing changed; the reply was only logged
    Logged,
}

/// Inbound event queue and reply interpreter for one session
#[derive(Debug)]
pub struct Dispatcher {
    events: EventStream,
}

impl Dispatcher {
    pub fn new(events: EventStream) -> Self {
        Self { events }
    }

    /// Take every event the transport queued since the last call
    pub fn pending(&mut self) -> Vec<TransportEvent> {
        self.events.drain()
    }

    /// Stop accepting events and discard anything queued
    pub fn close(&mut self) {
        self.events.close();
    }

    /// Wait for the next inbound event
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Decode, parse and dispatch one notification buffer
    ///
    /// # Returns
    /// `None` if the buffer was dropped as malformed
    pub fn handle_notification(
        &self,
        data: &[u8],
        session: &mut SessionState,
        listener: &ListenerSlot,
        stats: &mut LinkStatistics,
    ) -> Option<DispatchOutcome> {
        let Some(view) = frame::decode(data) else {
            log::trace!("[{}] Dropping notification: 0x{}", session.device(), to_hex(data));
            stats.increment_replies_dropped();
            return None;
        };

        if view.checksum_ok() == Some(false) {
            log::debug!("[{}] Checksum mismatch: 0x{}", session.device(), to_hex(data));
            stats.increment_checksum_mismatches();
        }

        let Some(reply) = Reply::from_frame(&view) else {
            log::debug!(
                "[{}] Reply 0x{:02X} too short: 0x{}",
                session.device(),
                view.opcode(),
                to_hex(data)
            );
            stats.increment_replies_dropped();
            return None;
        };

        stats.increment_replies_received();
        Some(Self::dispatch(&reply, session, listener, stats))
    }

    /// Apply a parsed reply to the session
    pub fn dispatch(
        reply: &Reply,
        session: &mut SessionState,
        listener: &ListenerSlot,
        stats: &mut LinkStatistics,
    ) -> DispatchOutcome {
        match reply {
            Reply::Battery { level } => {
                session.set_battery_percent(*level);
                listener.notify(|l| l.on_battery_level(*level));
                DispatchOutcome::Telemetry
            }
            Reply::PositionNotify { level } => {
                session.set_open_level(*level);
                listener.notify(|l| l.on_position(*level));
                DispatchOutcome::Telemetry
            }
            Reply::Position { level, settings } => {
                if let Some(settings) = settings {
                    session.set_settings(*settings);
                }
                session.set_open_level(*level);
                listener.notify(|l| l.on_position(*level));
                DispatchOutcome::Telemetry
            }
            Reply::Light { level } => {
                session.set_light_level(*level);
                listener.notify(|l| l.on_light_level(*level));
                DispatchOutcome::Telemetry
            }
            Reply::Login(ack) => Self::login(*ack, session, stats),
            Reply::SetPosition(ack) => match ack {
                Ack::Ack => DispatchOutcome::Acknowledged,
                Ack::Nack => {
                    stats.increment_nacks();
                    log::warn!("[{}] Position command nack!", session.device());
                    DispatchOutcome::Rejected
                }
                Ack::Other(byte) => {
                    log::info!("[{}] Position reply with status 0x{:02X}", session.device(), byte);
                    DispatchOutcome::Logged
                }
            },
            Reply::Move(ack) => match ack {
                Ack::Ack => {
                    log::info!("[{}] Move ok", session.device());
                    DispatchOutcome::Acknowledged
                }
                Ack::Nack => {
                    stats.increment_nacks();
                    log::warn!("[{}] Move nack", session.device());
                    DispatchOutcome::Rejected
                }
                Ack::Other(byte) => {
                    log::info!("[{}] Move reply with status 0x{:02X}", session.device(), byte);
                    DispatchOutcome::Logged
                }
            },
            Reply::UnknownReply { raw, .. } => {
                log::info!("[{}] Unknown reply: {}", session.device(), to_hex(raw));
                DispatchOutcome::Logged
            }
            Reply::Unrecognized { raw, .. } => {
                log::info!("[{}] Unknown notify data: 0x{}", session.device(), to_hex(raw));
                DispatchOutcome::Logged
            }
        }
    }

    fn login(ack: Ack, session: &mut SessionState, stats: &mut LinkStatistics) -> DispatchOutcome {
        match ack {
            Ack::Ack => match session.apply(LinkEvent::LoginAccepted) {
                Some(_) => {
                    log::info!("[{}] Pin ok", session.device());
                    DispatchOutcome::LoginAccepted
                }
                None => {
                    log::debug!("[{}] Login ack while {}", session.device(), session.link().as_str());
                    DispatchOutcome::Logged
                }
            },
            Ack::Nack => {
                stats.increment_nacks();
                log::warn!("[{}] Pin incorrect", session.device());
                match session.apply(LinkEvent::LoginRejected) {
                    Some(_) => DispatchOutcome::LoginRejected,
                    None => DispatchOutcome::Logged,
                }
            }
            Ack::Other(byte) => {
                log::info!("[{}] Login reply with status 0x{:02X}", session.device(), byte);
                DispatchOutcome::Logged
            }
        }
    }
}
