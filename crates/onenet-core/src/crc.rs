//! CRC-8 used for the packet header checksum and the payload checksum.

use serde::{Deserialize, Serialize};

/// Generator polynomial, forward (MSB-first) form.
pub const CRC8_POLYNOMIAL: u8 = 0x4D;
/// Generator polynomial, bit-reversed for reflected processing.
pub const CRC8_POLYNOMIAL_REFLECTED: u8 = 0xB2;

/// Initial value for the header (message) checksum.
pub const HEADER_CRC_INIT: u8 = 0xFF;
/// Bit order for the header (message) checksum.
pub const HEADER_CRC_ORDER: CrcOrder = CrcOrder::Forward;
/// Initial value for the payload checksum.
pub const PAYLOAD_CRC_INIT: u8 = 0xFF;
/// Bit order for the payload checksum.
pub const PAYLOAD_CRC_ORDER: CrcOrder = CrcOrder::Forward;

/// Bit-processing order of the CRC register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrcOrder {
    /// Most significant bit first.
    Forward,
    /// Least significant bit first.
    Reflected,
}

const fn build_forward_table() -> [u8; 256] {
    let mut table = [0_u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn build_reflected_table() -> [u8; 256] {
    let mut table = [0_u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x01 != 0 {
                (crc >> 1) ^ CRC8_POLYNOMIAL_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static FORWARD_TABLE: [u8; 256] = build_forward_table();
static REFLECTED_TABLE: [u8; 256] = build_reflected_table();

/// Computes the CRC-8 of `bytes` starting from `init`.
pub fn compute_crc(bytes: &[u8], init: u8, order: CrcOrder) -> u8 {
    let table = match order {
        CrcOrder::Forward => &FORWARD_TABLE,
        CrcOrder::Reflected => &REFLECTED_TABLE,
    };
    bytes
        .iter()
        .fold(init, |crc, byte| table[(crc ^ byte) as usize])
}

/// Header checksum over the covered header bytes.
pub fn header_crc(covered: &[u8]) -> u8 {
    compute_crc(covered, HEADER_CRC_INIT, HEADER_CRC_ORDER)
}

/// Payload checksum over the covered decrypted payload bytes.
pub fn payload_crc(covered: &[u8]) -> u8 {
    compute_crc(covered, PAYLOAD_CRC_INIT, PAYLOAD_CRC_ORDER)
}
