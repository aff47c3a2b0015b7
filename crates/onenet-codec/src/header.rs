//! Encoded packet header layout.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       3     preamble (55 55 55)
//! 3       1     start of frame (33)
//! 4       2     repeater DID
//! 6       2     message CRC (12-bit raw, CRC in the low 8 bits)
//! 8       2     destination DID
//! 10      6     NID
//! 16      2     source DID
//! 18      2     PID
//! 20      n     encoded payload
//! 20+n    1     hops (multi-hop packets only)
//! ```
//!
//! The message CRC covers the encoded repeater DID followed by the encoded
//! destination DID through PID.

use std::fmt;

use onenet_core::crc::header_crc;
use onenet_core::symbol::{decode_bits, encode_value_into};
use onenet_core::{DecodeError, Did, Hops, Nid, RawPid};
use thiserror::Error;

use crate::error::CodecError;

pub const PREAMBLE: [u8; 3] = [0x55, 0x55, 0x55];
pub const START_OF_FRAME: u8 = 0x33;

pub const ENCODED_PREAMBLE_IDX: usize = 0;
pub const ENCODED_SOF_IDX: usize = 3;
pub const ENCODED_RPTR_DID_IDX: usize = 4;
pub const ENCODED_MSG_CRC_IDX: usize = 6;
pub const ENCODED_MSG_CRC_LEN: usize = 2;
pub const ENCODED_DST_DID_IDX: usize = 8;
pub const ENCODED_NID_IDX: usize = 10;
pub const ENCODED_SRC_DID_IDX: usize = 16;
pub const ENCODED_PID_IDX: usize = 18;
pub const ENCODED_PLD_IDX: usize = 20;
/// Fixed encoded header length; shorter captures cannot be processed.
pub const ENCODED_HEADER_LEN: usize = ENCODED_PLD_IDX;
pub const ENCODED_HOPS_LEN: usize = 1;
/// Encoded bytes covered by the message CRC.
pub const HEADER_CRC_COVERED_LEN: usize =
    Did::ENCODED_LEN + (ENCODED_HEADER_LEN - ENCODED_DST_DID_IDX);

const MSG_CRC_FIELD_BITS: u32 = 12;

/// Header field identifiers used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    RepeaterDid,
    MsgCrc,
    DstDid,
    Nid,
    SrcDid,
    Pid,
    Hops,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeaderField::RepeaterDid => "repeater did",
            HeaderField::MsgCrc => "message crc",
            HeaderField::DstDid => "destination did",
            HeaderField::Nid => "nid",
            HeaderField::SrcDid => "source did",
            HeaderField::Pid => "pid",
            HeaderField::Hops => "hops",
        };
        f.write_str(name)
    }
}

/// A recoverable problem found while decoding the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderIssue {
    #[error("bad preamble")]
    BadPreamble,
    #[error("missing start of frame")]
    MissingStartOfFrame,
    #[error("{field}: {error}")]
    Field {
        field: HeaderField,
        error: DecodeError,
    },
    #[error("reserved bits set in message crc field")]
    CrcReservedBits,
    #[error("reserved bits 0x{0:X} set in pid")]
    PidReservedBits(u16),
    #[error("hops {hops} exceed max hops {max_hops}")]
    HopsExceedMax { hops: u8, max_hops: u8 },
}

/// Complete header description used when building packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub repeater_did: Did,
    pub dst_did: Did,
    pub nid: Nid,
    pub src_did: Did,
    pub pid: RawPid,
    /// Written only when `pid` carries the multi-hop flag.
    pub hops: Option<Hops>,
}

/// Header fields recovered from a capture.
///
/// A field is `None` when its symbols failed to decode; the reason is kept in
/// `issues` so the remaining fields can still be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedHeader {
    pub repeater_did: Option<Did>,
    /// 8-bit message CRC as carried on the wire.
    pub msg_crc: Option<u8>,
    pub dst_did: Option<Did>,
    pub nid: Option<Nid>,
    pub src_did: Option<Did>,
    pub pid: Option<RawPid>,
    pub hops: Option<Hops>,
    pub issues: Vec<HeaderIssue>,
}

impl DecodedHeader {
    /// True when every field decoded and no structural issue was found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Decodes the trailing hops symbol of a multi-hop packet.
    pub fn record_hops(&mut self, symbol: u8) {
        match Hops::decode(symbol) {
            Ok(hops) => {
                if !hops.is_consistent() {
                    self.issues.push(HeaderIssue::HopsExceedMax {
                        hops: hops.hops,
                        max_hops: hops.max_hops,
                    });
                }
                self.hops = Some(hops);
            }
            Err(error) => self.issues.push(HeaderIssue::Field {
                field: HeaderField::Hops,
                error,
            }),
        }
    }

    /// Returns the full header when every mandatory field decoded.
    pub fn complete(&self) -> Option<PacketHeader> {
        Some(PacketHeader {
            repeater_did: self.repeater_did?,
            dst_did: self.dst_did?,
            nid: self.nid?,
            src_did: self.src_did?,
            pid: self.pid?,
            hops: self.hops,
        })
    }
}

fn check_len(bytes: &[u8]) -> Result<(), CodecError> {
    if bytes.len() < ENCODED_HEADER_LEN {
        return Err(CodecError::TooShort {
            actual: bytes.len(),
            minimum: ENCODED_HEADER_LEN,
        });
    }
    Ok(())
}

/// Collects the encoded bytes covered by the message CRC.
pub fn header_crc_covered(bytes: &[u8]) -> Result<[u8; HEADER_CRC_COVERED_LEN], CodecError> {
    check_len(bytes)?;
    Ok(header_crc_covered_unchecked(bytes))
}

/// Computes the message CRC a capture should carry.
pub fn compute_header_crc(bytes: &[u8]) -> Result<u8, CodecError> {
    Ok(header_crc(&header_crc_covered(bytes)?))
}

fn field<T>(
    issues: &mut Vec<HeaderIssue>,
    field: HeaderField,
    result: Result<T, DecodeError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            issues.push(HeaderIssue::Field { field, error });
            None
        }
    }
}

/// Decodes every header field, continuing past individual field failures.
///
/// Only a buffer shorter than the fixed header is a hard error.
pub fn decode_header(bytes: &[u8]) -> Result<DecodedHeader, CodecError> {
    check_len(bytes)?;
    let mut issues = Vec::new();

    if bytes[ENCODED_PREAMBLE_IDX..ENCODED_SOF_IDX] != PREAMBLE {
        issues.push(HeaderIssue::BadPreamble);
    }
    if bytes[ENCODED_SOF_IDX] != START_OF_FRAME {
        issues.push(HeaderIssue::MissingStartOfFrame);
    }

    let repeater_did = field(
        &mut issues,
        HeaderField::RepeaterDid,
        Did::decode(&bytes[ENCODED_RPTR_DID_IDX..ENCODED_MSG_CRC_IDX]),
    );

    let crc_raw = field(
        &mut issues,
        HeaderField::MsgCrc,
        decode_bits(
            &bytes[ENCODED_MSG_CRC_IDX..ENCODED_MSG_CRC_IDX + ENCODED_MSG_CRC_LEN],
            MSG_CRC_FIELD_BITS,
        ),
    );
    if crc_raw.is_some_and(|raw| raw > u64::from(u8::MAX)) {
        issues.push(HeaderIssue::CrcReservedBits);
    }
    let msg_crc = crc_raw.map(|raw| (raw & 0xFF) as u8);

    let dst_did = field(
        &mut issues,
        HeaderField::DstDid,
        Did::decode(&bytes[ENCODED_DST_DID_IDX..ENCODED_NID_IDX]),
    );
    let nid = field(
        &mut issues,
        HeaderField::Nid,
        Nid::decode(&bytes[ENCODED_NID_IDX..ENCODED_SRC_DID_IDX]),
    );
    let src_did = field(
        &mut issues,
        HeaderField::SrcDid,
        Did::decode(&bytes[ENCODED_SRC_DID_IDX..ENCODED_PID_IDX]),
    );
    let pid = field(
        &mut issues,
        HeaderField::Pid,
        RawPid::decode(&bytes[ENCODED_PID_IDX..ENCODED_PLD_IDX]),
    );
    if let Some(reserved) = pid.map(RawPid::reserved_bits).filter(|r| *r != 0) {
        issues.push(HeaderIssue::PidReservedBits(reserved));
    }

    Ok(DecodedHeader {
        repeater_did,
        msg_crc,
        dst_did,
        nid,
        src_did,
        pid,
        hops: None,
        issues,
    })
}

/// Builds a complete encoded packet around an already-encoded payload.
///
/// The message CRC is computed and written; the hops symbol is appended when
/// the PID carries the multi-hop flag.
pub fn encode_frame(header: &PacketHeader, encoded_payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENCODED_HEADER_LEN + encoded_payload.len() + ENCODED_HOPS_LEN);
    out.extend_from_slice(&PREAMBLE);
    out.push(START_OF_FRAME);
    out.extend_from_slice(&header.repeater_did.encode());
    out.extend_from_slice(&[0_u8; ENCODED_MSG_CRC_LEN]);
    out.extend_from_slice(&header.dst_did.encode());
    out.extend_from_slice(&header.nid.encode());
    out.extend_from_slice(&header.src_did.encode());
    out.extend_from_slice(&header.pid.encode());

    let crc = header_crc(&header_crc_covered_unchecked(&out));
    let encoded = encode_value_into(
        u64::from(crc),
        &mut out[ENCODED_MSG_CRC_IDX..ENCODED_MSG_CRC_IDX + ENCODED_MSG_CRC_LEN],
    );
    debug_assert!(encoded.is_ok(), "an 8-bit CRC always fits the 12-bit field");

    out.extend_from_slice(encoded_payload);
    if header.pid.is_multi_hop() {
        let hops = header.hops.unwrap_or(Hops {
            hops: 0,
            max_hops: 0,
        });
        out.push(hops.encode());
    }
    out
}

fn header_crc_covered_unchecked(header: &[u8]) -> [u8; HEADER_CRC_COVERED_LEN] {
    let mut covered = [0_u8; HEADER_CRC_COVERED_LEN];
    covered[..Did::ENCODED_LEN]
        .copy_from_slice(&header[ENCODED_RPTR_DID_IDX..ENCODED_RPTR_DID_IDX + Did::ENCODED_LEN]);
    covered[Did::ENCODED_LEN..].copy_from_slice(&header[ENCODED_DST_DID_IDX..ENCODED_HEADER_LEN]);
    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use onenet_core::{PacketKind, PidFlags};

    fn sample_header() -> PacketHeader {
        PacketHeader {
            repeater_did: Did::new(0x000).unwrap(),
            dst_did: Did::new(0x002).unwrap(),
            nid: Nid::new(0x0_0000_0102).unwrap(),
            src_did: Did::MASTER,
            pid: RawPid::from_parts(PacketKind::SingleData, PidFlags::empty()),
            hops: None,
        }
    }

    #[test]
    fn encoded_header_has_expected_symbols() {
        let frame = encode_frame(&sample_header(), &[]);
        assert_eq!(frame.len(), ENCODED_HEADER_LEN);
        assert_eq!(&frame[..4], &[0x55, 0x55, 0x55, 0x33]);
        assert_eq!(&frame[ENCODED_RPTR_DID_IDX..ENCODED_MSG_CRC_IDX], &[0xB4, 0xB4]);
        assert_eq!(&frame[ENCODED_SRC_DID_IDX..ENCODED_PID_IDX], &[0xB4, 0xBC]);
        assert_eq!(&frame[ENCODED_PID_IDX..ENCODED_PLD_IDX], &[0xB4, 0xB4]);
    }

    #[test]
    fn decode_recovers_every_field_and_crc_matches() {
        let frame = encode_frame(&sample_header(), &[]);
        let decoded = decode_header(&frame).expect("header long enough");
        assert!(decoded.is_clean(), "issues: {:?}", decoded.issues);
        assert_eq!(decoded.complete(), Some(sample_header()));
        assert_eq!(decoded.msg_crc, Some(compute_header_crc(&frame).unwrap()));
    }

    #[test]
    fn crc_ignores_preamble_and_crc_field_but_covers_header() {
        let frame = encode_frame(&sample_header(), &[]);
        let base = compute_header_crc(&frame).unwrap();

        let mut other_preamble = frame.clone();
        other_preamble[0] = 0x00;
        other_preamble[ENCODED_MSG_CRC_IDX] = 0x22;
        assert_eq!(compute_header_crc(&other_preamble).unwrap(), base);

        let mut other_src = frame.clone();
        other_src[ENCODED_SRC_DID_IDX + 1] = 0xB3;
        assert_ne!(compute_header_crc(&other_src).unwrap(), base);
    }

    #[test]
    fn bad_field_is_reported_without_aborting() {
        let mut frame = encode_frame(&sample_header(), &[]);
        frame[ENCODED_NID_IDX] = 0x00;
        frame[0] = 0xAA;
        let decoded = decode_header(&frame).expect("header long enough");
        assert_eq!(decoded.nid, None);
        assert_eq!(decoded.src_did, Some(Did::MASTER));
        assert!(decoded.issues.contains(&HeaderIssue::BadPreamble));
        assert!(decoded.issues.contains(&HeaderIssue::Field {
            field: HeaderField::Nid,
            error: DecodeError::InvalidSymbol(0x00),
        }));
        assert_eq!(decoded.complete(), None);
    }

    #[test]
    fn reserved_pid_bits_are_flagged() {
        let mut header = sample_header();
        header.pid = RawPid::new(0x100).unwrap();
        let decoded = decode_header(&encode_frame(&header, &[])).unwrap();
        assert_eq!(decoded.issues, vec![HeaderIssue::PidReservedBits(1)]);
    }

    #[test]
    fn multi_hop_frames_carry_hops_symbol() {
        let mut header = sample_header();
        header.pid = RawPid::from_parts(PacketKind::SingleData, PidFlags::MULTI_HOP);
        header.hops = Some(Hops::new(1, 4).unwrap());
        let frame = encode_frame(&header, &[]);
        assert_eq!(frame.len(), ENCODED_HEADER_LEN + ENCODED_HOPS_LEN);

        let mut decoded = decode_header(&frame).unwrap();
        decoded.record_hops(frame[ENCODED_HEADER_LEN]);
        assert_eq!(decoded.hops, header.hops);
        assert!(decoded.is_clean());

        decoded.record_hops(Hops::new(5, 2).unwrap().encode());
        assert!(decoded
            .issues
            .contains(&HeaderIssue::HopsExceedMax { hops: 5, max_hops: 2 }));
    }

    #[test]
    fn short_buffer_is_a_hard_error() {
        assert_eq!(
            decode_header(&[0x55; 10]),
            Err(CodecError::TooShort {
                actual: 10,
                minimum: ENCODED_HEADER_LEN
            })
        );
    }
}
