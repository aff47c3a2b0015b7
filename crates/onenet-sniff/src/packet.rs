use onenet_codec::header::{DecodedHeader, HeaderIssue};
use onenet_codec::raw::RawPacket;
use onenet_core::{DecodeError, KeyScope, PacketKind};
use onenet_crypto::{CipherError, Key};
use serde::Serialize;
use thiserror::Error;

use crate::error::ParseError;
use crate::payload::Payload;

/// Per-stage validity flags; a packet is valid when all are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Validity {
    /// Every byte after the start of frame is a line symbol.
    pub valid_digits: bool,
    /// PID names a packet kind.
    pub valid_pid: bool,
    /// Encoded length matches the length implied by the PID.
    pub valid_length: bool,
    /// Header fields, hops, technique byte and payload symbols decoded cleanly.
    pub valid_decode: bool,
    pub valid_header_checksum: bool,
    /// A key from the matching keyring decrypted the payload.
    pub valid_decrypt: bool,
    pub valid_payload_checksum: bool,
}

impl Validity {
    pub fn all(&self) -> bool {
        self.valid_digits
            && self.valid_pid
            && self.valid_length
            && self.valid_decode
            && self.valid_header_checksum
            && self.valid_decrypt
            && self.valid_payload_checksum
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("pid symbols did not decode")]
    MissingPid,
    #[error("unknown packet kind 0x{0:02X}")]
    UnknownPid(u8),
    #[error("length {actual} does not match {expected} implied by the pid")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A recorded, non-fatal problem found while processing one packet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketIssue {
    #[error("header: {0}")]
    Header(HeaderIssue),
    #[error("invalid symbol 0x{byte:02X} at offset {offset}")]
    InvalidSymbol { offset: usize, byte: u8 },
    #[error("header checksum mismatch: carried 0x{carried:02X}, computed 0x{computed:02X}")]
    HeaderChecksumMismatch { carried: u8, computed: u8 },
    #[error("classification: {0}")]
    Classification(ClassificationError),
    #[error("payload symbols: {0}")]
    PayloadDecode(DecodeError),
    #[error("technique byte 0x{actual:02X}, expected 0x{expected:02X}")]
    Technique { expected: u8, actual: u8 },
    #[error("no {scope:?} key of {tried} decrypts the payload")]
    DecryptFailure { scope: KeyScope, tried: usize },
    #[error("cipher: {0}")]
    Cipher(CipherError),
}

/// A captured packet after every pipeline stage has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub raw: RawPacket,
    pub header: DecodedHeader,
    pub kind: Option<PacketKind>,
    pub validity: Validity,
    pub issues: Vec<PacketIssue>,
    /// Key whose decryption produced a matching payload CRC.
    pub key: Option<Key>,
    pub payload: Option<Payload>,
    pub parse_error: Option<ParseError>,
}

impl Packet {
    pub fn timestamp_ms(&self) -> u64 {
        self.raw.timestamp_ms()
    }

    /// Every stage succeeded and the payload parsed.
    pub fn is_valid(&self) -> bool {
        self.validity.all() && self.parse_error.is_none() && self.payload.is_some()
    }

    /// Short reasons for everything that went wrong.
    pub fn reasons(&self) -> Vec<String> {
        let mut out: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        if let Some(err) = &self.parse_error {
            out.push(format!("parse: {err}"));
        }
        out
    }
}
