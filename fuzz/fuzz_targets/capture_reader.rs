#![no_main]

use libfuzzer_sys::fuzz_target;
use onenet_sniff::capture::CaptureReader;

fuzz_target!(|data: &[u8]| {
    for item in CaptureReader::new(data) {
        let _ = item;
    }
});
