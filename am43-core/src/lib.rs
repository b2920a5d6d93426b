//! Core types and utilities for the AM43 blind motor protocol
//!
//! This crate provides the error type shared by every layer and the protocol
//! constants (opcodes, acknowledgement markers, GATT identifiers, defaults).

pub mod constants;
pub mod error;

pub use error::{Am43Error, Am43Result};
