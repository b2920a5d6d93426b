//! Protocol constants
//!
//! Opcodes, acknowledgement markers and link identifiers used by the AM43
//! blind motor. Command opcodes double as reply opcodes: the device answers a
//! request with a reply carrying the same opcode.

// ============================================================================
// GATT identifiers
// ============================================================================

/// Primary service exposed by the motor.
pub const SERVICE_UUID: &str = "0000fe50-0000-1000-8000-00805f9b34fb";
/// Read/notify characteristic all frames travel over.
pub const CHARACTERISTIC_UUID: &str = "0000fe51-0000-1000-8000-00805f9b34fb";

// ============================================================================
// Framing
// ============================================================================

/// Fixed preamble of every outbound frame. The last byte is the reply marker.
pub const PREAMBLE: [u8; 5] = [0x00, 0xFF, 0x00, 0x00, 0x9A];
/// First byte of every inbound notification.
pub const REPLY_MARKER: u8 = 0x9A;
/// Largest payload a single length byte can describe.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

// ============================================================================
// Opcodes
// ============================================================================

/// Open / close / stop.
pub const OP_MOVE: u8 = 0x0A;
/// Move to an absolute position.
pub const OP_SET_POSITION: u8 = 0x0D;
/// PIN login.
pub const OP_LOGIN: u8 = 0x17;
/// Unsolicited position push sent while the blind is moving.
pub const OP_NOTIFY_POSITION: u8 = 0xA1;
/// Battery level request / reply.
pub const OP_GET_BATTERY: u8 = 0xA2;
/// Position and device settings request / reply.
pub const OP_GET_POSITION: u8 = 0xA7;
/// Reply of unknown meaning, seen after some commands.
pub const OP_REPLY_UNKNOWN1: u8 = 0xA8;
/// Reply of unknown meaning, seen after some commands.
pub const OP_REPLY_UNKNOWN2: u8 = 0xA9;
/// Light sensor request / reply.
pub const OP_GET_LIGHT: u8 = 0xAA;

// ============================================================================
// Payload values
// ============================================================================

pub const RESPONSE_ACK: u8 = 0x5A;
pub const RESPONSE_NACK: u8 = 0xA5;

pub const MOVE_OPEN: u8 = 0xDD;
pub const MOVE_CLOSE: u8 = 0xEE;
pub const MOVE_STOP: u8 = 0xCC;

/// Payload byte carried by every telemetry request.
pub const QUERY_PAYLOAD: u8 = 0x01;

/// Highest accepted position (percent closed).
pub const MAX_POSITION: u8 = 100;

// ============================================================================
// Defaults
// ============================================================================

/// PIN printed on the motor.
pub const DEFAULT_PIN: u16 = 8888;
/// Default telemetry poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
/// Delay between a successful login and the first telemetry poll.
pub const DEFAULT_LOGIN_SETTLE_MS: u64 = 1_000;
