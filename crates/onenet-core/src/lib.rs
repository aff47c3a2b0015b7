//! Core ONE-NET primitives shared across crates.
//!
//! Includes the 6-to-8 symbol codec, the CRC-8 engine, fixed-width network
//! identifier types, and the base decode error.

pub mod crc;
pub mod error;
pub mod symbol;
pub mod types;

pub use error::DecodeError;
pub use types::{Did, Hops, KeyScope, MsgId, Nid, PacketKind, PidFlags, RawPid};
