#![no_main]

use libfuzzer_sys::fuzz_target;
use onenet_codec::raw::RawPacket;
use onenet_crypto::{KeyRings, XteaCipher};
use onenet_sniff::attribute::AttributeSet;
use onenet_sniff::decode_packet;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = RawPacket::new(0, data.to_vec()) else {
        return;
    };
    let keys = KeyRings::with_default_network_key();
    if let Ok(packet) = decode_packet(raw, &keys, &XteaCipher) {
        let _ = AttributeSet::default().render(0, &packet).to_string();
    }
});
