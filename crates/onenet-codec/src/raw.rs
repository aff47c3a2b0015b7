use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Encoded packet bytes as captured off the air, with the capture time.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPacket {
    timestamp_ms: u64,
    bytes: Vec<u8>,
}

impl RawPacket {
    /// Wraps captured bytes, rejecting an empty capture.
    pub fn new(timestamp_ms: u64, bytes: Vec<u8>) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(Self {
            timestamp_ms,
            bytes,
        })
    }

    /// Parses a capture written as hex digits; whitespace between digits is ignored.
    pub fn from_hex(timestamp_ms: u64, text: &str) -> Result<Self, CodecError> {
        let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() {
            return Err(CodecError::Empty);
        }
        if digits.len() % 2 != 0 {
            return Err(CodecError::OddHexDigits(digits.len()));
        }
        let bytes = hex::decode(&digits).map_err(|err| match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                CodecError::InvalidHexDigit { ch: c, index }
            }
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                CodecError::OddHexDigits(digits.len())
            }
        })?;
        Self::new(timestamp_ms, bytes)
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Upper-case hex rendering of the captured bytes.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.bytes)
    }
}
