use std::panic;

use onenet_codec::raw::RawPacket;
use onenet_crypto::{KeyRings, XteaCipher};
use onenet_sniff::attribute::AttributeSet;
use onenet_sniff::capture::CaptureReader;
use onenet_sniff::decode_packet;

const SINGLE_APP_FIXTURE: &str = "55555533B4BCB4C3B4B6B4B4B4B4BAA5B4BCB4B4A626B5C3C6B2C23A5456CABC";

fn xorshift64(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn decode_and_render(bytes: Vec<u8>, keys: &KeyRings) {
    let Ok(raw) = RawPacket::new(1, bytes) else {
        return;
    };
    if let Ok(packet) = decode_packet(raw, keys, &XteaCipher) {
        let _ = AttributeSet::default().render(1, &packet).to_string();
        let _ = packet.reasons();
    }
}

#[test]
fn random_packets_never_panic_the_pipeline() {
    let keys = KeyRings::with_default_network_key();
    let mut state = 0xD1B5_4A32_D192_ED03_u64;
    for _ in 0..1500 {
        let len = (xorshift64(&mut state) % 80) as usize;
        let bytes: Vec<u8> = (0..len).map(|_| xorshift64(&mut state) as u8).collect();
        let keys = &keys;
        let result = panic::catch_unwind(|| decode_and_render(bytes, keys));
        assert!(result.is_ok());
    }
}

#[test]
fn mutated_fixture_never_panics_the_pipeline() {
    let keys = KeyRings::with_default_network_key();
    let base = hex::decode(SINGLE_APP_FIXTURE).unwrap();
    let mut state = 0x2545_F491_4F6C_DD1D_u64;
    for _ in 0..1500 {
        let mut bytes = base.clone();
        for _ in 0..=(xorshift64(&mut state) % 4) {
            let idx = (xorshift64(&mut state) as usize) % bytes.len();
            bytes[idx] = xorshift64(&mut state) as u8;
        }
        if xorshift64(&mut state) % 5 == 0 {
            bytes.truncate((xorshift64(&mut state) as usize) % bytes.len());
        }
        let keys = &keys;
        let result = panic::catch_unwind(|| decode_and_render(bytes, keys));
        assert!(result.is_ok());
    }
}

#[test]
fn random_capture_text_never_panics_the_reader() {
    let alphabet = b"0123456789abcdefABCDEF received bytes:\n";
    let mut state = 0x9E37_79B9_7F4A_7C15_u64;
    for _ in 0..300 {
        let len = (xorshift64(&mut state) % 200) as usize;
        let text: String = (0..len)
            .map(|_| alphabet[(xorshift64(&mut state) as usize) % alphabet.len()] as char)
            .collect();
        let result = panic::catch_unwind(|| CaptureReader::new(text.as_bytes()).count());
        assert!(result.is_ok());
    }
}
