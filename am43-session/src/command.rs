//! Outbound commands
//!
//! Every request the client can issue, with the opcode and payload it maps
//! to. A command is encoded into a fresh frame each time it is sent.

use crate::frame;
use am43_core::constants::{
    MAX_POSITION, MOVE_CLOSE, MOVE_OPEN, MOVE_STOP, OP_GET_BATTERY, OP_GET_LIGHT,
    OP_GET_POSITION, OP_LOGIN, OP_MOVE, OP_SET_POSITION, QUERY_PAYLOAD,
};
use am43_core::{Am43Error, Am43Result};
use bytes::Bytes;

/// Direction argument of a MOVE command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Open,
    Close,
    Stop,
}

impl MoveDirection {
    pub fn payload_byte(&self) -> u8 {
        match self {
            MoveDirection::Open => MOVE_OPEN,
            MoveDirection::Close => MOVE_CLOSE,
            MoveDirection::Stop => MOVE_STOP,
        }
    }
}

/// Telemetry request selected by the polling cursor
///
/// The discriminant is the cursor value: battery, then position, then light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum TelemetryQuery {
    #[default]
    Battery = 0,
    Position = 1,
    Light = 2,
}

impl TelemetryQuery {
    /// Number of distinct queries in one polling round
    pub const COUNT: u8 = 3;

    /// Map a cursor value to its query, wrapping modulo [`Self::COUNT`]
    pub fn from_cursor(cursor: u8) -> Self {
        match cursor % Self::COUNT {
            0 => TelemetryQuery::Battery,
            1 => TelemetryQuery::Position,
            _ => TelemetryQuery::Light,
        }
    }

    pub fn cursor(&self) -> u8 {
        *self as u8
    }

    /// Query that follows this one in the round
    pub fn next(&self) -> Self {
        Self::from_cursor(self.cursor() + 1)
    }

    pub fn opcode(&self) -> u8 {
        match self {
            TelemetryQuery::Battery => OP_GET_BATTERY,
            TelemetryQuery::Position => OP_GET_POSITION,
            TelemetryQuery::Light => OP_GET_LIGHT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryQuery::Battery => "battery",
            TelemetryQuery::Position => "position",
            TelemetryQuery::Light => "light",
        }
    }
}

/// Command sent to the motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(MoveDirection),
    /// Target position in percent closed (0-100)
    SetPosition(u8),
    Login { pin: u16 },
    Query(TelemetryQuery),
}

impl Command {
    /// Build a validated SET_POSITION command
    ///
    /// # Errors
    /// Returns `Am43Error::PositionOutOfRange` for levels above 100
    pub fn set_position(level: u8) -> Am43Result<Self> {
        if level > MAX_POSITION {
            return Err(Am43Error::PositionOutOfRange(level));
        }
        Ok(Command::SetPosition(level))
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Command::Move(_) => OP_MOVE,
            Command::SetPosition(_) => OP_SET_POSITION,
            Command::Login { .. } => OP_LOGIN,
            Command::Query(query) => query.opcode(),
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::Move(direction) => vec![direction.payload_byte()],
            Command::SetPosition(level) => vec![*level],
            Command::Login { pin } => pin.to_be_bytes().to_vec(),
            Command::Query(_) => vec![QUERY_PAYLOAD],
        }
    }

    /// Encode the command into a frame
    ///
    /// # Errors
    /// Returns `Am43Error::PositionOutOfRange` for an out-of-range
    /// `SetPosition`, which is never put on the wire
    pub fn encode(&self) -> Am43Result<Bytes> {
        if let Command::SetPosition(level) = self {
            if *level > MAX_POSITION {
                return Err(Am43Error::PositionOutOfRange(*level));
            }
        }
        frame::encode(self.opcode(), &self.payload())
    }
}
