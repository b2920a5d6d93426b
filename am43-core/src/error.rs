use thiserror::Error;

/// Main error type for AM43 operations
///
/// Malformed inbound data is not represented here: the frame decoder and the
/// reply parser drop such buffers and return `None`.
#[derive(Error, Debug)]
pub enum Am43Error {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Device is not connected")]
    NotConnected,

    #[error("Session has been shut down")]
    SessionClosed,

    #[error("Payload too long: {len} bytes, maximum {max}")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Position out of range: {0} (expected 0-100)")]
    PositionOutOfRange(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for AM43 operations
pub type Am43Result<T> = Result<T, Am43Error>;
