//! ONE-NET wire codec primitives.
//!
//! Defines the encoded packet layout, raw capture ingest, header
//! decode/encode with the header checksum, and the per-kind payload layout.

pub mod error;
pub mod header;
pub mod layout;
pub mod raw;
