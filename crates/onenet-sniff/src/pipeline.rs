//! Trial-decrypt classification pipeline and the matching packet encoder.
//!
//! Every stage records its own outcome on the [`Packet`] and later stages
//! still run where they can. Only a buffer shorter than the fixed header
//! stops a packet outright.

use onenet_codec::header::{
    compute_header_crc, decode_header, encode_frame, PacketHeader, ENCODED_PLD_IDX,
    ENCODED_RPTR_DID_IDX,
};
use onenet_codec::layout::{expected_packet_len, PayloadLayout, PLD_CRC_COVERED_START, PLD_CRC_IDX};
use onenet_codec::raw::RawPacket;
use onenet_core::crc::payload_crc;
use onenet_core::symbol::{decode_bytes, encode_bytes, first_invalid_symbol};
use onenet_core::PacketKind;
use onenet_crypto::{CipherError, Key, KeyRings, Keyring, PayloadCipher};
use tracing::debug;

use crate::error::PipelineError;
use crate::packet::{ClassificationError, Packet, PacketIssue, Validity};
use crate::payload::Payload;

/// True when the embedded CRC matches the decrypted bytes it covers.
pub fn payload_crc_matches(decrypted: &[u8]) -> bool {
    match decrypted.get(PLD_CRC_IDX) {
        Some(carried) => *carried == payload_crc(&decrypted[PLD_CRC_COVERED_START..]),
        None => false,
    }
}

/// Tries each key in keyring order and returns the first whose decryption
/// carries a matching payload CRC.
pub fn trial_decrypt<C: PayloadCipher>(
    kind: PacketKind,
    layout: &PayloadLayout,
    encrypted: &[u8],
    keyring: &Keyring,
    cipher: &C,
) -> Result<Option<(Key, Vec<u8>)>, CipherError> {
    for (key_index, key) in keyring.iter().enumerate() {
        let decrypted = cipher.decrypt(key, layout.rounds, encrypted)?;
        let matched = payload_crc_matches(&decrypted);
        debug!(kind = %kind, key_index, matched, "trial decrypt");
        if matched {
            return Ok(Some((*key, decrypted)));
        }
    }
    Ok(None)
}

#[derive(Default)]
struct PayloadOutcome {
    decoded: bool,
    key: Option<Key>,
    payload: Option<Payload>,
    parse_error: Option<crate::error::ParseError>,
}

/// Runs every pipeline stage over one captured packet.
pub fn decode_packet<C: PayloadCipher>(
    raw: RawPacket,
    keys: &KeyRings,
    cipher: &C,
) -> Result<Packet, PipelineError> {
    let bytes = raw.bytes();
    let mut header = decode_header(bytes)?;
    let mut validity = Validity::default();
    let mut issues = Vec::new();

    validity.valid_digits = match first_invalid_symbol(&bytes[ENCODED_RPTR_DID_IDX..]) {
        None => true,
        Some((offset, byte)) => {
            issues.push(PacketIssue::InvalidSymbol {
                offset: ENCODED_RPTR_DID_IDX + offset,
                byte,
            });
            false
        }
    };

    let computed = compute_header_crc(bytes)?;
    validity.valid_header_checksum = header.msg_crc == Some(computed);
    if let Some(carried) = header.msg_crc.filter(|carried| *carried != computed) {
        issues.push(PacketIssue::HeaderChecksumMismatch { carried, computed });
    }

    let kind = match header.pid {
        None => {
            issues.push(PacketIssue::Classification(ClassificationError::MissingPid));
            None
        }
        Some(pid) => {
            let kind = pid.kind();
            if kind.is_none() {
                issues.push(PacketIssue::Classification(ClassificationError::UnknownPid(
                    pid.kind_code(),
                )));
            }
            kind
        }
    };
    validity.valid_pid = kind.is_some();

    let mut outcome = PayloadOutcome::default();
    if let (Some(kind), Some(pid)) = (kind, header.pid) {
        let layout = PayloadLayout::for_kind(kind);
        let expected = expected_packet_len(pid).unwrap_or(0);
        if bytes.len() != expected {
            issues.push(PacketIssue::Classification(
                ClassificationError::LengthMismatch {
                    expected,
                    actual: bytes.len(),
                },
            ));
        } else {
            validity.valid_length = true;
            if pid.is_multi_hop() {
                header.record_hops(bytes[expected - 1]);
            }
            let encoded = &bytes[ENCODED_PLD_IDX..ENCODED_PLD_IDX + layout.encoded_len()];
            outcome = decode_payload(kind, &layout, encoded, keys, cipher, &mut issues);
        }
    }

    validity.valid_decode = header.is_clean() && outcome.decoded;
    validity.valid_decrypt = outcome.key.is_some();
    validity.valid_payload_checksum = outcome.key.is_some();

    let mut all_issues: Vec<PacketIssue> =
        header.issues.iter().copied().map(PacketIssue::Header).collect();
    all_issues.extend(issues);

    let packet = Packet {
        raw,
        header,
        kind,
        validity,
        issues: all_issues,
        key: outcome.key,
        payload: outcome.payload,
        parse_error: outcome.parse_error,
    };
    debug!(
        timestamp_ms = packet.timestamp_ms(),
        valid = packet.is_valid(),
        issues = packet.issues.len(),
        "decoded packet"
    );
    Ok(packet)
}

fn decode_payload<C: PayloadCipher>(
    kind: PacketKind,
    layout: &PayloadLayout,
    encoded: &[u8],
    keys: &KeyRings,
    cipher: &C,
    issues: &mut Vec<PacketIssue>,
) -> PayloadOutcome {
    let mut outcome = PayloadOutcome::default();
    let raw_payload = match decode_bytes(encoded, layout.raw_len()) {
        Ok(raw_payload) => raw_payload,
        Err(error) => {
            issues.push(PacketIssue::PayloadDecode(error));
            return outcome;
        }
    };

    let (encrypted, technique) = raw_payload.split_at(layout.encrypted_len());
    outcome.decoded = true;
    if technique.first() != Some(&layout.technique) {
        issues.push(PacketIssue::Technique {
            expected: layout.technique,
            actual: technique.first().copied().unwrap_or(0),
        });
        outcome.decoded = false;
    }

    let keyring = keys.for_scope(layout.key_scope);
    match trial_decrypt(kind, layout, encrypted, keyring, cipher) {
        Ok(Some((key, decrypted))) => {
            outcome.key = Some(key);
            match Payload::parse(kind, decrypted) {
                Ok(payload) => outcome.payload = Some(payload),
                Err(err) => outcome.parse_error = Some(err),
            }
        }
        Ok(None) => issues.push(PacketIssue::DecryptFailure {
            scope: layout.key_scope,
            tried: keyring.len(),
        }),
        Err(err) => issues.push(PacketIssue::Cipher(err)),
    }
    outcome
}

/// Builds a complete encoded packet.
///
/// `body` is the plaintext following the payload CRC; it is zero-padded to
/// the kind's payload size. The payload CRC, encryption, technique byte,
/// header CRC and hops symbol are all filled in.
pub fn encode_packet<C: PayloadCipher>(
    header: &PacketHeader,
    body: &[u8],
    key: &Key,
    cipher: &C,
) -> Result<Vec<u8>, PipelineError> {
    let kind = header
        .pid
        .kind()
        .ok_or(PipelineError::UnknownPid(header.pid.raw()))?;
    let layout = PayloadLayout::for_kind(kind);
    let capacity = layout.encrypted_len() - PLD_CRC_COVERED_START;
    if body.len() > capacity {
        return Err(PipelineError::BodyTooLong {
            actual: body.len(),
            capacity,
        });
    }

    let mut plaintext = vec![0_u8; layout.encrypted_len()];
    plaintext[PLD_CRC_COVERED_START..PLD_CRC_COVERED_START + body.len()].copy_from_slice(body);
    plaintext[PLD_CRC_IDX] = payload_crc(&plaintext[PLD_CRC_COVERED_START..]);

    let mut raw_payload = cipher.encrypt(key, layout.rounds, &plaintext)?;
    raw_payload.push(layout.technique);
    Ok(encode_frame(header, &encode_bytes(&raw_payload)))
}
