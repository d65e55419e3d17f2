#![no_main]
use bgpkit_collector::parser::parse_bmp_packet;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);
    let _ = parse_bmp_packet(&mut bytes.clone());
});
