use thiserror::Error;

/// Shared error type for symbol-level decode/encode operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Byte is not a member of the 6-to-8 symbol table.
    #[error("invalid symbol 0x{0:02X}")]
    InvalidSymbol(u8),
    /// Symbol sequence length does not match the field width.
    #[error("wrong length: expected {expected} symbols, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    /// Value does not fit in the field's bit width.
    #[error("value 0x{value:X} does not fit in {bits} bits")]
    ValueTooWide { value: u64, bits: u32 },
}

#[cfg(test)]
mod tests {
    use super::DecodeError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            DecodeError::InvalidSymbol(0xFF).to_string(),
            "invalid symbol 0xFF"
        );
        assert_eq!(
            DecodeError::WrongLength {
                expected: 2,
                actual: 1
            }
            .to_string(),
            "wrong length: expected 2 symbols, got 1"
        );
        assert_eq!(
            DecodeError::ValueTooWide {
                value: 0x1000,
                bits: 12
            }
            .to_string(),
            "value 0x1000 does not fit in 12 bits"
        );
    }
}
