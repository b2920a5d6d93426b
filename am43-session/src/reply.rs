//! Typed inbound replies
//!
//! Each notification is parsed once into a [`Reply`] variant that carries only
//! the fields its opcode defines. Every field read goes through the
//! bounds-checked [`FrameView`], so a notification that is shorter than the
//! offsets its opcode needs is rejected as a whole.

use crate::frame::{self, FrameView};
use am43_core::constants::{
    OP_GET_BATTERY, OP_GET_LIGHT, OP_GET_POSITION, OP_LOGIN, OP_MOVE, OP_NOTIFY_POSITION,
    OP_REPLY_UNKNOWN1, OP_REPLY_UNKNOWN2, OP_SET_POSITION, RESPONSE_ACK, RESPONSE_NACK,
};
use bytes::Bytes;

/// Offset of the ack/nack byte in LOGIN, MOVE and SET_POSITION replies
const ACK_OFFSET: usize = 3;
/// Offset of the battery percentage in GET_BATTERY replies
const BATTERY_OFFSET: usize = 7;
/// Offset of the position in unsolicited position pushes
const NOTIFY_POSITION_OFFSET: usize = 4;
/// Offset of the position in GET_POSITION replies
const POSITION_OFFSET: usize = 5;
/// Offset of the light level in GET_LIGHT replies
const LIGHT_OFFSET: usize = 5;

// GET_POSITION settings block
const FLAGS_OFFSET: usize = 3;
const SPEED_OFFSET: usize = 4;
const SHADE_LENGTH_OFFSET: usize = 6;
const DIAMETER_OFFSET: usize = 8;
const ROLLER_TYPE_OFFSET: usize = 9;

/// Single-byte acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ack,
    Nack,
    /// Any other byte in the ack position
    Other(u8),
}

impl Ack {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            RESPONSE_ACK => Ack::Ack,
            RESPONSE_NACK => Ack::Nack,
            other => Ack::Other(other),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Ack::Ack)
    }
}

/// Configuration flags reported in a GET_POSITION reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ConfigFlags(pub u8);

impl ConfigFlags {
    pub fn reversed_direction(&self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn operation_mode(&self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn top_limit_set(&self) -> bool {
        self.0 & 0x04 != 0
    }

    pub fn bottom_limit_set(&self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn has_light_sensor(&self) -> bool {
        self.0 & 0x10 != 0
    }
}

/// Motor settings carried alongside the position in a GET_POSITION reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DeviceSettings {
    pub flags: ConfigFlags,
    pub speed: u8,
    pub shade_length: u16,
    pub roller_diameter: u8,
    pub roller_type: u8,
}

impl DeviceSettings {
    fn parse(view: &FrameView<'_>) -> Option<Self> {
        Some(Self {
            flags: ConfigFlags(view.byte(FLAGS_OFFSET)?),
            speed: view.byte(SPEED_OFFSET)?,
            shade_length: view.u16_be(SHADE_LENGTH_OFFSET)?,
            roller_diameter: view.byte(DIAMETER_OFFSET)?,
            roller_type: view.byte(ROLLER_TYPE_OFFSET)?,
        })
    }
}

/// Parsed notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Battery { level: u8 },
    SetPosition(Ack),
    /// Unsolicited push while the blind moves
    PositionNotify { level: u8 },
    /// Answer to GET_POSITION; settings are present when the reply is long enough
    Position { level: u8, settings: Option<DeviceSettings> },
    Light { level: u8 },
    Login(Ack),
    Move(Ack),
    /// Known opcode with unknown meaning
    UnknownReply { opcode: u8, raw: Bytes },
    /// Opcode this client does not know
    Unrecognized { opcode: u8, raw: Bytes },
}

impl Reply {
    /// Decode and parse a raw notification buffer
    ///
    /// # Returns
    /// `None` for anything that is not a well-formed reply: wrong marker,
    /// truncated buffer, or a payload shorter than the field the opcode needs
    pub fn parse(data: &[u8]) -> Option<Self> {
        Self::from_frame(&frame::decode(data)?)
    }

    /// Parse an already decoded frame
    pub fn from_frame(view: &FrameView<'_>) -> Option<Self> {
        let opcode = view.opcode();
        let reply = match opcode {
            OP_GET_BATTERY => Reply::Battery {
                level: view.byte(BATTERY_OFFSET)?,
            },
            OP_SET_POSITION => Reply::SetPosition(Ack::from_byte(view.byte(ACK_OFFSET)?)),
            OP_NOTIFY_POSITION => Reply::PositionNotify {
                level: view.byte(NOTIFY_POSITION_OFFSET)?,
            },
            OP_GET_POSITION => Reply::Position {
                level: view.byte(POSITION_OFFSET)?,
                settings: DeviceSettings::parse(view),
            },
            OP_GET_LIGHT => Reply::Light {
                level: view.byte(LIGHT_OFFSET)?,
            },
            OP_LOGIN => Reply::Login(Ack::from_byte(view.byte(ACK_OFFSET)?)),
            OP_MOVE => Reply::Move(Ack::from_byte(view.byte(ACK_OFFSET)?)),
            OP_REPLY_UNKNOWN1 | OP_REPLY_UNKNOWN2 => Reply::UnknownReply {
                opcode,
                raw: Bytes::copy_from_slice(view.as_bytes()),
            },
            _ => Reply::Unrecognized {
                opcode,
                raw: Bytes::copy_from_slice(view.as_bytes()),
            },
        };
        Some(reply)
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Reply::Battery { .. } => OP_GET_BATTERY,
            Reply::SetPosition(_) => OP_SET_POSITION,
            Reply::PositionNotify { .. } => OP_NOTIFY_POSITION,
            Reply::Position { .. } => OP_GET_POSITION,
            Reply::Light { .. } => OP_GET_LIGHT,
            Reply::Login(_) => OP_LOGIN,
            Reply::Move(_) => OP_MOVE,
            Reply::UnknownReply { opcode, .. } | Reply::Unrecognized { opcode, .. } => *opcode,
        }
    }
}
