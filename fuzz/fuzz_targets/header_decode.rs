#![no_main]

use libfuzzer_sys::fuzz_target;
use onenet_codec::header::{compute_header_crc, decode_header};
use onenet_codec::raw::RawPacket;

fuzz_target!(|data: &[u8]| {
    let _ = decode_header(data);
    let _ = compute_header_crc(data);
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = RawPacket::from_hex(0, text);
    }
});
