#![no_main]
use bgpkit_collector::parser::{parse_netflow_packet, TemplateCache};
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use std::net::{IpAddr, Ipv4Addr};

fuzz_target!(|data: &[u8]| {
    let cache = TemplateCache::new();
    let exporter = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
    // twice, so data sets can match templates learned on the first pass
    let bytes = Bytes::copy_from_slice(data);
    let _ = parse_netflow_packet(&mut bytes.clone(), exporter, &cache);
    let _ = parse_netflow_packet(&mut bytes.clone(), exporter, &cache);
});
