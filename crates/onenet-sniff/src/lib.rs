//! ONE-NET packet analysis.
//!
//! This crate turns captured packets into validated, typed records: trial
//! decryption against a keyring, payload classification, a timestamp-ordered
//! record store, and the interval-set filter used to query it.

pub mod attribute;
pub mod capture;
pub mod config;
pub mod error;
pub mod filter;
pub mod packet;
pub mod payload;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod store;

pub use config::SniffConfig;
pub use error::{ConfigError, ParseError, PipelineError, SessionError, StoreError};
pub use packet::{Packet, PacketIssue, Validity};
pub use payload::Payload;
pub use pipeline::{decode_packet, encode_packet};
pub use session::AnalysisSession;
pub use store::PacketStore;
