#![no_main]
use bgpkit_collector::BmpFrameDecoder;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let peer = "192.0.2.1:40000".parse().unwrap();
    let mut decoder = BmpFrameDecoder::new(peer, 1 << 16);
    // feed in two halves so frames straddle reads
    let (first, second) = data.split_at(data.len() / 2);
    let mut buf = BytesMut::from(first);
    while let Ok(Some(_)) = decoder.decode(&mut buf) {}
    buf.extend_from_slice(second);
    while let Ok(Some(_)) = decoder.decode_eof(&mut buf) {}
    assert!(buf.is_empty());
});
