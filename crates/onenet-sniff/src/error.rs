use onenet_codec::error::CodecError;
use onenet_core::DecodeError;
use onenet_crypto::{CipherError, KeyError};
use thiserror::Error;

use crate::filter::range_set::RangeError;

/// Variant-specific payload parse failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{field} needs bytes {start}..{end}, payload has {len}")]
    OutOfBounds {
        field: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),
    #[error("{field}: {error}")]
    Symbol {
        field: &'static str,
        error: DecodeError,
    },
    #[error("odd number of hex digits ({0})")]
    OddHexDigits(usize),
    #[error("invalid hex digit {ch:?} at index {index}")]
    InvalidHexDigit { ch: char, index: usize },
}

/// Errors that stop one packet from being decoded or built at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("pid 0x{0:03X} does not name a packet kind")]
    UnknownPid(u16),
    #[error("body of {actual} bytes exceeds the {capacity} byte payload")]
    BodyTooLong { actual: usize, capacity: usize },
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
}

/// Record store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("a packet is already stored at timestamp {0}")]
    DuplicateTimestamp(u64),
}

/// Malformed keys, filter expressions or attribute names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("unknown attribute {0:?}")]
    UnknownAttribute(String),
    #[error("{field}: {source}")]
    Range {
        field: &'static str,
        #[source]
        source: RangeError,
    },
    #[error("invalid number {0:?}")]
    BadNumber(String),
    #[error("invalid command {0:?}")]
    BadCommand(String),
}

/// Errors surfaced by the analysis session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Hex text that could not be turned into bytes.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Reports malformed hex text as a parse error, other codec errors as-is.
    pub(crate) fn from_hex_input(err: CodecError) -> Self {
        match err {
            CodecError::OddHexDigits(len) => ParseError::OddHexDigits(len).into(),
            CodecError::InvalidHexDigit { ch, index } => {
                ParseError::InvalidHexDigit { ch, index }.into()
            }
            other => other.into(),
        }
    }
}
