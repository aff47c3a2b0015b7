//! ONE-NET 6-bit to 8-bit line coding.
//!
//! Every 6-bit raw group is carried on the air as one 8-bit symbol taken from
//! a fixed table whose entries keep the number of set and clear bits close
//! together. Wider values are split into 6-bit groups; the first symbol on the
//! wire carries the most significant group.

use crate::error::DecodeError;

/// Raw bits carried by one encoded symbol.
pub const RAW_BITS_PER_SYMBOL: u32 = 6;
/// Largest raw value a single symbol can carry.
pub const MAX_RAW_SYMBOL_VALUE: u8 = 0x3F;
/// Marker in the inverse table for bytes that are not symbols.
pub const INVALID_SYMBOL: u8 = 0xFF;
/// Widest value (in symbols) that fits the `u64` assembly helpers.
pub const MAX_VALUE_SYMBOLS: usize = 10;

/// Raw 6-bit value to encoded symbol.
const DECODED_TO_ENCODED: [u8; 64] = [
    0xB4, 0xBC, 0xB3, 0xB5, 0xBA, 0xB6, 0xB9, 0xB2, //
    0xC4, 0xCC, 0xC3, 0xC5, 0xCA, 0xC6, 0xC9, 0xC2, //
    0x34, 0x3C, 0x33, 0x35, 0x3A, 0x36, 0x39, 0x32, //
    0x54, 0x5C, 0x53, 0x55, 0x5A, 0x56, 0x59, 0x52, //
    0xA4, 0xAC, 0xA3, 0xA5, 0xAA, 0xA6, 0xA9, 0xA2, //
    0x64, 0x6C, 0x63, 0x65, 0x6A, 0x66, 0x69, 0x62, //
    0x94, 0x9C, 0x93, 0x95, 0x9A, 0x96, 0x99, 0x92, //
    0x24, 0x2C, 0x23, 0x25, 0x2A, 0x26, 0x29, 0x22, //
];

const fn build_encoded_to_decoded() -> [u8; 256] {
    let mut table = [INVALID_SYMBOL; 256];
    let mut raw = 0;
    while raw < DECODED_TO_ENCODED.len() {
        table[DECODED_TO_ENCODED[raw] as usize] = raw as u8;
        raw += 1;
    }
    table
}

/// Encoded symbol to raw 6-bit value, `INVALID_SYMBOL` where no mapping exists.
const ENCODED_TO_DECODED: [u8; 256] = build_encoded_to_decoded();

/// Encodes one raw 6-bit value as its line symbol.
pub fn encode_6to8(raw: u8) -> Result<u8, DecodeError> {
    if raw > MAX_RAW_SYMBOL_VALUE {
        return Err(DecodeError::ValueTooWide {
            value: u64::from(raw),
            bits: RAW_BITS_PER_SYMBOL,
        });
    }
    Ok(DECODED_TO_ENCODED[raw as usize])
}

/// Encodes the low six bits of `raw`, ignoring anything above them.
pub fn encode_6to8_masked(raw: u8) -> u8 {
    DECODED_TO_ENCODED[(raw & MAX_RAW_SYMBOL_VALUE) as usize]
}

/// Decodes one line symbol back to its raw 6-bit value.
pub fn decode_8to6(symbol: u8) -> Result<u8, DecodeError> {
    match ENCODED_TO_DECODED[symbol as usize] {
        INVALID_SYMBOL => Err(DecodeError::InvalidSymbol(symbol)),
        raw => Ok(raw),
    }
}

/// Returns whether `byte` is a member of the symbol table.
pub fn is_valid_symbol(byte: u8) -> bool {
    ENCODED_TO_DECODED[byte as usize] != INVALID_SYMBOL
}

/// Returns the offset and value of the first byte that is not a symbol.
pub fn first_invalid_symbol(bytes: &[u8]) -> Option<(usize, u8)> {
    bytes
        .iter()
        .enumerate()
        .find(|(_, b)| !is_valid_symbol(**b))
        .map(|(idx, b)| (idx, *b))
}

/// Number of symbols needed to carry a `bits`-wide value.
pub const fn symbols_for_bits(bits: u32) -> usize {
    bits.div_ceil(RAW_BITS_PER_SYMBOL) as usize
}

/// Encodes `value` into `out.len()` symbols, most significant group first.
pub fn encode_value_into(value: u64, out: &mut [u8]) -> Result<(), DecodeError> {
    if out.len() > MAX_VALUE_SYMBOLS {
        return Err(DecodeError::WrongLength {
            expected: MAX_VALUE_SYMBOLS,
            actual: out.len(),
        });
    }
    let bits = out.len() as u32 * RAW_BITS_PER_SYMBOL;
    if bits < u64::BITS && value >> bits != 0 {
        return Err(DecodeError::ValueTooWide { value, bits });
    }

    let mut remaining = value;
    // Groups are peeled off least significant first and written back to front.
    for slot in out.iter_mut().rev() {
        *slot = DECODED_TO_ENCODED[(remaining & u64::from(MAX_RAW_SYMBOL_VALUE)) as usize];
        remaining >>= RAW_BITS_PER_SYMBOL;
    }
    Ok(())
}

/// Decodes a run of symbols into one integer, first symbol most significant.
pub fn decode_value(symbols: &[u8]) -> Result<u64, DecodeError> {
    if symbols.len() > MAX_VALUE_SYMBOLS {
        return Err(DecodeError::WrongLength {
            expected: MAX_VALUE_SYMBOLS,
            actual: symbols.len(),
        });
    }
    symbols.iter().try_fold(0_u64, |acc, symbol| {
        let raw = decode_8to6(*symbol)?;
        Ok((acc << RAW_BITS_PER_SYMBOL) | u64::from(raw))
    })
}

/// Encodes a `bits`-wide field into exactly `symbols_for_bits(bits)` symbols.
///
/// Fails closed when `value` does not fit in `bits`.
pub fn encode_bits(value: u64, bits: u32) -> Result<Vec<u8>, DecodeError> {
    if bits < u64::BITS && value >> bits != 0 {
        return Err(DecodeError::ValueTooWide { value, bits });
    }
    let mut out = vec![0_u8; symbols_for_bits(bits)];
    encode_value_into(value, &mut out)?;
    Ok(out)
}

/// Decodes a `bits`-wide field, checking both the symbol count and that the
/// padding bits above `bits` are clear.
pub fn decode_bits(symbols: &[u8], bits: u32) -> Result<u64, DecodeError> {
    let expected = symbols_for_bits(bits);
    if symbols.len() != expected {
        return Err(DecodeError::WrongLength {
            expected,
            actual: symbols.len(),
        });
    }
    let value = decode_value(symbols)?;
    if bits < u64::BITS && value >> bits != 0 {
        return Err(DecodeError::ValueTooWide { value, bits });
    }
    Ok(value)
}

/// Number of symbols needed to carry `raw_len` bytes as a bit stream.
pub const fn encoded_len(raw_len: usize) -> usize {
    (raw_len * 8).div_ceil(RAW_BITS_PER_SYMBOL as usize)
}

/// Encodes a byte string as a big-endian bit stream of 6-bit groups.
///
/// The final group is zero padded.
pub fn encode_bytes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(raw.len()));
    let mut acc: u32 = 0;
    let mut acc_bits: u32 = 0;
    for byte in raw {
        acc = (acc << 8) | u32::from(*byte);
        acc_bits += 8;
        while acc_bits >= RAW_BITS_PER_SYMBOL {
            acc_bits -= RAW_BITS_PER_SYMBOL;
            let group = (acc >> acc_bits) & u32::from(MAX_RAW_SYMBOL_VALUE);
            out.push(DECODED_TO_ENCODED[group as usize]);
        }
        acc &= (1 << acc_bits) - 1;
    }
    if acc_bits > 0 {
        let group = (acc << (RAW_BITS_PER_SYMBOL - acc_bits)) & u32::from(MAX_RAW_SYMBOL_VALUE);
        out.push(DECODED_TO_ENCODED[group as usize]);
    }
    out
}

/// Decodes `raw_len` bytes from a symbol stream produced by [`encode_bytes`].
///
/// The whole operation fails if any symbol is invalid.
pub fn decode_bytes(symbols: &[u8], raw_len: usize) -> Result<Vec<u8>, DecodeError> {
    let expected = encoded_len(raw_len);
    if symbols.len() != expected {
        return Err(DecodeError::WrongLength {
            expected,
            actual: symbols.len(),
        });
    }

    let mut out = Vec::with_capacity(raw_len);
    let mut acc: u32 = 0;
    let mut acc_bits: u32 = 0;
    for symbol in symbols {
        acc = (acc << RAW_BITS_PER_SYMBOL) | u32::from(decode_8to6(*symbol)?);
        acc_bits += RAW_BITS_PER_SYMBOL;
        if acc_bits >= 8 && out.len() < raw_len {
            acc_bits -= 8;
            out.push((acc >> acc_bits) as u8);
        }
        acc &= (1 << acc_bits) - 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_64_distinct_symbols() {
        let mut seen = [false; 256];
        for raw in 0..=MAX_RAW_SYMBOL_VALUE {
            let symbol = encode_6to8(raw).expect("raw value in range");
            assert!(!seen[symbol as usize], "duplicate symbol {symbol:02X}");
            seen[symbol as usize] = true;
        }
        assert_eq!(seen.iter().filter(|s| **s).count(), 64);
    }

    #[test]
    fn known_symbols_match_wire_table() {
        assert_eq!(encode_6to8(0x00).unwrap(), 0xB4);
        assert_eq!(encode_6to8(0x01).unwrap(), 0xBC);
        assert_eq!(encode_6to8(0x1B).unwrap(), 0x55);
        assert_eq!(encode_6to8(0x12).unwrap(), 0x33);
        assert_eq!(encode_6to8(0x3F).unwrap(), 0x22);
    }

    #[test]
    fn every_raw_value_round_trips() {
        for raw in 0..=MAX_RAW_SYMBOL_VALUE {
            let symbol = encode_6to8(raw).unwrap();
            assert_eq!(decode_8to6(symbol).unwrap(), raw);
        }
    }

    #[test]
    fn every_valid_symbol_round_trips() {
        for byte in 0..=u8::MAX {
            if let Ok(raw) = decode_8to6(byte) {
                assert_eq!(encode_6to8(raw).unwrap(), byte);
            }
        }
    }

    #[test]
    fn non_symbols_are_rejected() {
        assert_eq!(decode_8to6(0xFF), Err(DecodeError::InvalidSymbol(0xFF)));
        assert_eq!(decode_8to6(0x00), Err(DecodeError::InvalidSymbol(0x00)));
        assert!(!is_valid_symbol(0x44));
        assert_eq!(first_invalid_symbol(&[0xB4, 0xBC, 0x00]), Some((2, 0x00)));
        assert_eq!(first_invalid_symbol(&[0xB4, 0xBC]), None);
    }

    #[test]
    fn raw_value_wider_than_six_bits_fails_closed() {
        assert!(matches!(
            encode_6to8(0x40),
            Err(DecodeError::ValueTooWide { bits: 6, .. })
        ));
    }

    #[test]
    fn masked_encode_drops_bits_above_six() {
        assert_eq!(encode_6to8_masked(0x3F), 0x22);
        assert_eq!(encode_6to8_masked(0x40), 0xB4);
        assert_eq!(encode_6to8_masked(0x41), encode_6to8(0x01).unwrap());
    }

    #[test]
    fn multi_symbol_values_are_msb_first() {
        // 0x001 -> groups [0x00, 0x01]
        assert_eq!(encode_bits(0x001, 12).unwrap(), vec![0xB4, 0xBC]);
        assert_eq!(decode_bits(&[0xB4, 0xBC], 12).unwrap(), 0x001);
        assert_eq!(decode_bits(&[0xBC, 0xB4], 12).unwrap(), 0x040);
    }

    #[test]
    fn fixed_width_fields_round_trip() {
        for value in [0_u64, 1, 0x7FF, 0xFFF] {
            assert_eq!(decode_bits(&encode_bits(value, 12).unwrap(), 12).unwrap(), value);
        }
        for value in [0_u64, 0x1_2345_6789, 0xF_FFFF_FFFF] {
            let symbols = encode_bits(value, 36).unwrap();
            assert_eq!(symbols.len(), 6);
            assert_eq!(decode_bits(&symbols, 36).unwrap(), value);
        }
        for value in [0_u64, 0xAB_CDEF, 0xFF_FFFF] {
            let symbols = encode_bits(value, 24).unwrap();
            assert_eq!(symbols.len(), 4);
            assert_eq!(decode_bits(&symbols, 24).unwrap(), value);
        }
        for value in [0_u64, 0xDEAD_BEEF, u64::from(u32::MAX)] {
            let symbols = encode_bits(value, 32).unwrap();
            assert_eq!(symbols.len(), 6);
            assert_eq!(decode_bits(&symbols, 32).unwrap(), value);
        }
    }

    #[test]
    fn too_wide_values_fail_instead_of_truncating() {
        assert_eq!(
            encode_bits(0x1000, 12),
            Err(DecodeError::ValueTooWide {
                value: 0x1000,
                bits: 12
            })
        );
        // Six symbols hold 36 bits; a 32-bit field must keep the top 4 clear.
        let wide = encode_bits(0xF_0000_0000, 36).unwrap();
        assert!(matches!(
            decode_bits(&wide, 32),
            Err(DecodeError::ValueTooWide { bits: 32, .. })
        ));
    }

    #[test]
    fn one_bad_group_fails_the_whole_field() {
        assert_eq!(
            decode_bits(&[0xB4, 0x00], 12),
            Err(DecodeError::InvalidSymbol(0x00))
        );
        assert_eq!(
            decode_bits(&[0xB4], 12),
            Err(DecodeError::WrongLength {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn byte_streams_round_trip_with_padding() {
        for len in 0..40 {
            let raw: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(37) ^ 0x5A).collect();
            let symbols = encode_bytes(&raw);
            assert_eq!(symbols.len(), encoded_len(len));
            assert!(symbols.iter().all(|s| is_valid_symbol(*s)));
            assert_eq!(decode_bytes(&symbols, len).unwrap(), raw);
        }
    }

    #[test]
    fn encoded_len_matches_payload_sizes() {
        assert_eq!(encoded_len(9), 12);
        assert_eq!(encoded_len(17), 23);
        assert_eq!(encoded_len(25), 34);
        assert_eq!(encoded_len(33), 44);
    }
}
