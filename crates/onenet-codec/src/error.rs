use onenet_core::DecodeError;
use thiserror::Error;

/// Errors returned by packet-level codec operations.
///
/// These abort processing of a single packet before any stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Capture contained no bytes.
    #[error("empty packet")]
    Empty,
    /// Hex capture had an odd number of digits.
    #[error("odd number of hex digits ({0})")]
    OddHexDigits(usize),
    /// Hex capture contained a non-hex character.
    #[error("invalid hex digit {ch:?} at index {index}")]
    InvalidHexDigit { ch: char, index: usize },
    /// Buffer shorter than the fixed encoded header.
    #[error("packet too short: {actual} bytes, need at least {minimum}")]
    TooShort { actual: usize, minimum: usize },
    /// Symbol-level failure while encoding.
    #[error("symbol error: {0}")]
    Symbol(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::CodecError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CodecError::OddHexDigits(3).to_string(),
            "odd number of hex digits (3)"
        );
        assert_eq!(
            CodecError::TooShort {
                actual: 4,
                minimum: 20
            }
            .to_string(),
            "packet too short: 4 bytes, need at least 20"
        );
    }
}
