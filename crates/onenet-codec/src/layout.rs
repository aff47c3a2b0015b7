//! Per-kind payload geometry.

use onenet_core::symbol::encoded_len;
use onenet_core::{KeyScope, PacketKind, RawPid};
use serde::{Deserialize, Serialize};

use crate::header::{ENCODED_HEADER_LEN, ENCODED_HOPS_LEN};

/// Cipher block size in bytes.
pub const XTEA_BLOCK_LEN: usize = 8;
/// Cipher rounds for everything except stream traffic.
pub const FULL_ROUNDS: u8 = 32;
/// Reduced cipher rounds for stream traffic.
pub const STREAM_ROUNDS: u8 = 8;
/// Trailing technique byte for full-round encryption.
pub const TECHNIQUE_XTEA32: u8 = 0x01;
/// Trailing technique byte for reduced-round stream encryption.
pub const TECHNIQUE_XTEA8: u8 = 0x02;
/// Length of the cleartext technique trailer.
pub const TECHNIQUE_LEN: usize = 1;

/// Index of the payload CRC inside the decrypted payload.
pub const PLD_CRC_IDX: usize = 0;
/// First byte covered by the payload CRC.
pub const PLD_CRC_COVERED_START: usize = 1;

/// Fixed payload geometry for one packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLayout {
    pub kind: PacketKind,
    /// Number of cipher blocks.
    pub blocks: usize,
    /// Cipher rounds used for this kind.
    pub rounds: u8,
    /// Expected trailing technique byte.
    pub technique: u8,
    pub key_scope: KeyScope,
}

impl PayloadLayout {
    pub fn for_kind(kind: PacketKind) -> Self {
        let blocks = match kind {
            PacketKind::SingleData
            | PacketKind::SingleAck
            | PacketKind::SingleNack
            | PacketKind::BlockAck
            | PacketKind::BlockNack
            | PacketKind::BlockTerminate
            | PacketKind::StreamAck
            | PacketKind::StreamNack
            | PacketKind::StreamTerminate
            | PacketKind::InviteRequest => 1,
            PacketKind::Route | PacketKind::RouteAck | PacketKind::RouteNack => 2,
            PacketKind::Invite => 3,
            PacketKind::BlockData | PacketKind::StreamData => 4,
        };
        let (rounds, technique) = if kind.is_stream() {
            (STREAM_ROUNDS, TECHNIQUE_XTEA8)
        } else {
            (FULL_ROUNDS, TECHNIQUE_XTEA32)
        };
        Self {
            kind,
            blocks,
            rounds,
            technique,
            key_scope: kind.key_scope(),
        }
    }

    /// Bytes covered by the cipher (CRC byte included).
    pub fn encrypted_len(&self) -> usize {
        self.blocks * XTEA_BLOCK_LEN
    }

    /// Decoded payload length: cipher blocks plus the technique trailer.
    pub fn raw_len(&self) -> usize {
        self.encrypted_len() + TECHNIQUE_LEN
    }

    /// Payload length on the wire, in symbols.
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.raw_len())
    }
}

/// Total encoded packet length implied by a PID, or `None` for an unknown kind.
pub fn expected_packet_len(pid: RawPid) -> Option<usize> {
    let layout = PayloadLayout::for_kind(pid.kind()?);
    let hops = if pid.is_multi_hop() {
        ENCODED_HOPS_LEN
    } else {
        0
    };
    Some(ENCODED_HEADER_LEN + layout.encoded_len() + hops)
}
