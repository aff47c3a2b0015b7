//! Capture file reader.
//!
//! Each packet starts on a line of the form
//!
//! ```text
//! <timestamp_ms> received <N> bytes: <hex bytes...>
//! ```
//!
//! and its hex bytes may continue on following lines until `N` bytes are
//! collected. A malformed packet yields one error item; the reader then
//! resynchronises on the next header line.

use std::io::{self, BufRead};

use onenet_codec::error::CodecError;
use onenet_codec::raw::RawPacket;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected a packet header, found {text:?}")]
    MalformedHeader { line: usize, text: String },
    #[error("line {line}: invalid hex bytes")]
    InvalidHex { line: usize },
    #[error("line {line}: packet announced {expected} bytes, found {actual}")]
    LengthMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("line {line}: {source}")]
    Codec {
        line: usize,
        #[source]
        source: CodecError,
    },
}

struct HeaderLine {
    timestamp_ms: u64,
    expected: usize,
    bytes: Vec<u8>,
}

fn parse_hex_tokens(tokens: &str) -> Option<Vec<u8>> {
    let digits: String = tokens.split_whitespace().collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    hex::decode(digits).ok()
}

/// Parses `<ts> received <N> bytes: <hex...>`; `None` when the line is not a header.
fn parse_header(text: &str) -> Option<Result<HeaderLine, ()>> {
    let (prefix, hex_part) = text.split_once("bytes:")?;
    let mut words = prefix.split_whitespace();
    let timestamp_ms = words.next()?.parse::<u64>().ok()?;
    if words.next() != Some("received") {
        return None;
    }
    let expected = words.next()?.parse::<usize>().ok()?;
    if words.next().is_some() {
        return None;
    }
    Some(parse_hex_tokens(hex_part).ok_or(()).map(|bytes| HeaderLine {
        timestamp_ms,
        expected,
        bytes,
    }))
}

/// Iterator over the packets of a capture.
pub struct CaptureReader<R> {
    lines: io::Lines<R>,
    line_no: usize,
    pending: Option<(usize, String)>,
    /// Set after the first I/O error; the reader yields nothing more.
    failed: bool,
}

impl<R: BufRead> CaptureReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
            failed: false,
        }
    }

    fn next_line(&mut self) -> Option<io::Result<(usize, String)>> {
        if let Some(pending) = self.pending.take() {
            return Some(Ok(pending));
        }
        if self.failed {
            return None;
        }
        let line = self.lines.next()?;
        self.line_no += 1;
        if let Err(err) = &line {
            warn!(line = self.line_no, "capture read failed: {err}");
            self.failed = true;
        }
        Some(line.map(|text| (self.line_no, text)))
    }

    fn read_packet(&mut self, line: usize, header: HeaderLine) -> Result<RawPacket, CaptureError> {
        let HeaderLine {
            timestamp_ms,
            expected,
            mut bytes,
        } = header;
        while bytes.len() < expected {
            let Some(next) = self.next_line() else {
                break;
            };
            let (next_no, text) = next?;
            if text.trim().is_empty() || parse_header(&text).is_some() {
                self.pending = Some((next_no, text));
                break;
            }
            match parse_hex_tokens(&text) {
                Some(more) => bytes.extend(more),
                None => return Err(CaptureError::InvalidHex { line: next_no }),
            }
        }
        if bytes.len() != expected {
            return Err(CaptureError::LengthMismatch {
                line,
                expected,
                actual: bytes.len(),
            });
        }
        RawPacket::new(timestamp_ms, bytes).map_err(|source| CaptureError::Codec { line, source })
    }
}

impl<R: BufRead> Iterator for CaptureReader<R> {
    type Item = Result<RawPacket, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line, text) = match self.next_line()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            if text.trim().is_empty() {
                continue;
            }
            let item = match parse_header(&text) {
                Some(Ok(header)) => self.read_packet(line, header),
                Some(Err(())) => Err(CaptureError::InvalidHex { line }),
                None => Err(CaptureError::MalformedHeader {
                    line,
                    text: text.trim().to_string(),
                }),
            };
            if let Err(err) = &item {
                warn!(error = %err, "skipping capture entry");
            }
            return Some(item);
        }
    }
}
