/*!
Provides parsing for sFlow version 5 datagrams.

A datagram is a fixed header followed by self-describing samples; each sample and each
record inside it carries its own `data_format` and length, so unknown kinds are kept as
opaque bytes instead of failing the whole datagram.

<https://sflow.org/sflow_version_5.txt>
*/
use crate::models::*;
use crate::parser::ReadUtils;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::debug;
use std::net::IpAddr;

pub mod error;

use error::ParserSflowError;

/// Length of the sample `data_format` and `length` words that precede every sample.
const SAMPLE_HEADER_LEN: usize = 8;
/// Length of a generic interface counter record body.
const GENERIC_INTERFACE_COUNTERS_LEN: usize = 88;

/// What to do with a datagram that does not hold exactly the samples its header announces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SflowMode {
    /// Fail the datagram with [ParserSflowError::TrailingBytes] on a partial sample, or with
    /// [ParserSflowError::SampleCountMismatch] when it ends at a sample boundary too early.
    Strict,
    /// Drop the partial sample and keep the complete ones, whatever the announced count.
    #[default]
    Lenient,
}

/// Parse one sFlow datagram.
pub fn parse_sflow_packet(
    data: &mut Bytes,
    mode: SflowMode,
) -> Result<SflowPacket, ParserSflowError> {
    let version = data.read_u32()?;
    if version != SFLOW_VERSION_5 {
        return Err(ParserSflowError::UnsupportedVersion(version));
    }
    let agent_address = match AgentAddressType::try_from(data.read_u32()?)? {
        AgentAddressType::Ipv4 => IpAddr::V4(data.read_ipv4_address()?),
        AgentAddressType::Ipv6 => IpAddr::V6(data.read_ipv6_address()?),
    };
    let sub_agent_id = data.read_u32()?;
    let sequence_number = data.read_u32()?;
    let sys_uptime = data.read_u32()?;
    let sample_count = data.read_u32()?;

    let mut samples = vec![];
    while data.has_remaining() {
        // peek at the sample header before consuming anything
        let sample_len = match data.get(4..SAMPLE_HEADER_LEN) {
            Some(len) => u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize,
            None => usize::MAX,
        };
        if data.remaining() < SAMPLE_HEADER_LEN || data.remaining() - SAMPLE_HEADER_LEN < sample_len
        {
            match mode {
                SflowMode::Strict => {
                    return Err(ParserSflowError::TrailingBytes {
                        remaining: data.remaining(),
                    })
                }
                SflowMode::Lenient => {
                    debug!(
                        "sFlow agent {}: dropping {} trailing bytes after sample {}",
                        agent_address,
                        data.remaining(),
                        samples.len()
                    );
                    data.advance(data.remaining());
                    break;
                }
            }
        }
        let (enterprise, format) = split_data_format(data.read_u32()?);
        let sample_len = data.read_u32()? as usize;
        let mut sample_data = data.read_n_bytes(sample_len)?;
        let sample = parse_sample(enterprise, format, &mut sample_data)
            .map_err(ParserSflowError::sample_overrun)?;
        samples.push(sample);
    }

    if samples.len() != sample_count as usize {
        if mode == SflowMode::Strict {
            return Err(ParserSflowError::SampleCountMismatch {
                declared: sample_count,
                decoded: samples.len(),
            });
        }
        debug!(
            "sFlow agent {}: header announces {} samples, decoded {}",
            agent_address,
            sample_count,
            samples.len()
        );
    }

    Ok(SflowPacket {
        version,
        agent_address,
        sub_agent_id,
        sequence_number,
        sys_uptime,
        sample_count,
        samples,
    })
}

fn parse_sample(
    enterprise: u32,
    format: u32,
    data: &mut Bytes,
) -> Result<SflowSample, ParserSflowError> {
    let sample_type = match enterprise {
        0 => SampleType::try_from(format).ok(),
        _ => None,
    };
    let sample = match sample_type {
        Some(SampleType::FlowSample) => SflowSample::Flow(parse_flow_sample(data, false)?),
        Some(SampleType::CounterSample) => {
            SflowSample::Counter(parse_counter_sample(data, false)?)
        }
        Some(SampleType::ExpandedFlowSample) => {
            SflowSample::ExpandedFlow(parse_flow_sample(data, true)?)
        }
        Some(SampleType::ExpandedCounterSample) => {
            SflowSample::ExpandedCounter(parse_counter_sample(data, true)?)
        }
        None => SflowSample::Unknown {
            enterprise,
            format,
            data: data.split_to(data.len()),
        },
    };
    Ok(sample)
}

/// Read the source id as `(type, index)`: one word split 8/24 in the compact form, two
/// words in the expanded form.
fn read_source_id(data: &mut Bytes, expanded: bool) -> Result<(u32, u32), ParserSflowError> {
    if expanded {
        Ok((data.read_u32()?, data.read_u32()?))
    } else {
        let source_id = data.read_u32()?;
        Ok((source_id >> 24, source_id & 0x00ff_ffff))
    }
}

/// Read an interface as `(format, value)`: one word split 2/30 in the compact form, two
/// words in the expanded form.
fn read_interface(data: &mut Bytes, expanded: bool) -> Result<(u32, u32), ParserSflowError> {
    if expanded {
        Ok((data.read_u32()?, data.read_u32()?))
    } else {
        let interface = data.read_u32()?;
        Ok((interface >> 30, interface & 0x3fff_ffff))
    }
}

fn parse_flow_sample(data: &mut Bytes, expanded: bool) -> Result<FlowSample, ParserSflowError> {
    let sequence_number = data.read_u32()?;
    let (source_id_type, source_id_index) = read_source_id(data, expanded)?;
    let sampling_rate = data.read_u32()?;
    let sample_pool = data.read_u32()?;
    let drops = data.read_u32()?;
    let (input_format, input) = read_interface(data, expanded)?;
    let (output_format, output) = read_interface(data, expanded)?;

    let record_count = data.read_u32()?;
    let mut records = vec![];
    for _ in 0..record_count {
        let (enterprise, format) = split_data_format(data.read_u32()?);
        let record_len = data.read_u32()? as usize;
        let mut record_data = data.read_bounded(record_len, "sFlow flow record")?;
        let record_data = match (enterprise, format) {
            (0, 1) => FlowRecordData::RawPacketHeader(RawPacketHeader {
                protocol: record_data.read_u32()?,
                frame_length: record_data.read_u32()?,
                stripped: record_data.read_u32()?,
                header: {
                    let header_len = record_data.read_u32()? as usize;
                    record_data.read_n_bytes(header_len)?
                },
            }),
            _ => FlowRecordData::Unknown(record_data),
        };
        records.push(FlowRecord {
            enterprise,
            format,
            data: record_data,
        });
    }

    Ok(FlowSample {
        sequence_number,
        source_id_type,
        source_id_index,
        sampling_rate,
        sample_pool,
        drops,
        input_format,
        input,
        output_format,
        output,
        records,
    })
}

fn parse_counter_sample(
    data: &mut Bytes,
    expanded: bool,
) -> Result<CounterSample, ParserSflowError> {
    let sequence_number = data.read_u32()?;
    let (source_id_type, source_id_index) = read_source_id(data, expanded)?;

    let record_count = data.read_u32()?;
    let mut records = vec![];
    for _ in 0..record_count {
        let (enterprise, format) = split_data_format(data.read_u32()?);
        let record_len = data.read_u32()? as usize;
        let mut record_data = data.read_bounded(record_len, "sFlow counter record")?;
        let record_data = match (enterprise, format) {
            (0, 1) => CounterRecordData::GenericInterface(parse_generic_interface_counters(
                &mut record_data,
            )?),
            _ => CounterRecordData::Unknown(record_data),
        };
        records.push(CounterRecord {
            enterprise,
            format,
            data: record_data,
        });
    }

    Ok(CounterSample {
        sequence_number,
        source_id_type,
        source_id_index,
        records,
    })
}

fn parse_generic_interface_counters(
    data: &mut Bytes,
) -> Result<GenericInterfaceCounters, ParserSflowError> {
    data.has_n_remaining(GENERIC_INTERFACE_COUNTERS_LEN)?;
    Ok(GenericInterfaceCounters {
        if_index: data.read_u32()?,
        if_type: data.read_u32()?,
        if_speed: data.read_u64()?,
        if_direction: data.read_u32()?,
        if_status: data.read_u32()?,
        in_octets: data.read_u64()?,
        in_ucast_pkts: data.read_u32()?,
        in_multicast_pkts: data.read_u32()?,
        in_broadcast_pkts: data.read_u32()?,
        in_discards: data.read_u32()?,
        in_errors: data.read_u32()?,
        in_unknown_protos: data.read_u32()?,
        out_octets: data.read_u64()?,
        out_ucast_pkts: data.read_u32()?,
        out_multicast_pkts: data.read_u32()?,
        out_broadcast_pkts: data.read_u32()?,
        out_discards: data.read_u32()?,
        out_errors: data.read_u32()?,
        promiscuous_mode: data.read_u32()?,
    })
}

impl SflowPacket {
    /// Encode the datagram. `sample_count` is written as stored.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.version);
        buf.put_u32(self.agent_address_type().into());
        match self.agent_address {
            IpAddr::V4(ip) => buf.put_slice(&ip.octets()),
            IpAddr::V6(ip) => buf.put_slice(&ip.octets()),
        }
        buf.put_u32(self.sub_agent_id);
        buf.put_u32(self.sequence_number);
        buf.put_u32(self.sys_uptime);
        buf.put_u32(self.sample_count);
        for sample in &self.samples {
            let (sample_type, body) = match sample {
                SflowSample::Flow(s) => (join_data_format(0, 1), encode_flow_sample(s, false)),
                SflowSample::Counter(s) => {
                    (join_data_format(0, 2), encode_counter_sample(s, false))
                }
                SflowSample::ExpandedFlow(s) => {
                    (join_data_format(0, 3), encode_flow_sample(s, true))
                }
                SflowSample::ExpandedCounter(s) => {
                    (join_data_format(0, 4), encode_counter_sample(s, true))
                }
                SflowSample::Unknown {
                    enterprise,
                    format,
                    data,
                } => (join_data_format(*enterprise, *format), data.clone()),
            };
            buf.put_u32(sample_type);
            buf.put_u32(body.len() as u32);
            buf.put(body);
        }
        buf.freeze()
    }
}

fn put_pair(buf: &mut BytesMut, expanded: bool, shift: u32, kind: u32, value: u32) {
    if expanded {
        buf.put_u32(kind);
        buf.put_u32(value);
    } else {
        buf.put_u32((kind << shift) | value);
    }
}

fn encode_flow_sample(sample: &FlowSample, expanded: bool) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u32(sample.sequence_number);
    put_pair(
        &mut buf,
        expanded,
        24,
        sample.source_id_type,
        sample.source_id_index,
    );
    buf.put_u32(sample.sampling_rate);
    buf.put_u32(sample.sample_pool);
    buf.put_u32(sample.drops);
    put_pair(&mut buf, expanded, 30, sample.input_format, sample.input);
    put_pair(&mut buf, expanded, 30, sample.output_format, sample.output);
    buf.put_u32(sample.records.len() as u32);
    for record in &sample.records {
        let body = match &record.data {
            FlowRecordData::RawPacketHeader(h) => {
                let mut body = BytesMut::new();
                body.put_u32(h.protocol);
                body.put_u32(h.frame_length);
                body.put_u32(h.stripped);
                body.put_u32(h.header.len() as u32);
                body.put_slice(&h.header);
                // XDR opaque data is padded to a 4-byte boundary
                body.put_bytes(0, (4 - h.header.len() % 4) % 4);
                body.freeze()
            }
            FlowRecordData::Unknown(b) => b.clone(),
        };
        buf.put_u32(join_data_format(record.enterprise, record.format));
        buf.put_u32(body.len() as u32);
        buf.put(body);
    }
    buf.freeze()
}

fn encode_counter_sample(sample: &CounterSample, expanded: bool) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u32(sample.sequence_number);
    put_pair(
        &mut buf,
        expanded,
        24,
        sample.source_id_type,
        sample.source_id_index,
    );
    buf.put_u32(sample.records.len() as u32);
    for record in &sample.records {
        let body = match &record.data {
            CounterRecordData::GenericInterface(c) => {
                let mut body = BytesMut::with_capacity(GENERIC_INTERFACE_COUNTERS_LEN);
                body.put_u32(c.if_index);
                body.put_u32(c.if_type);
                body.put_u64(c.if_speed);
                body.put_u32(c.if_direction);
                body.put_u32(c.if_status);
                body.put_u64(c.in_octets);
                body.put_u32(c.in_ucast_pkts);
                body.put_u32(c.in_multicast_pkts);
                body.put_u32(c.in_broadcast_pkts);
                body.put_u32(c.in_discards);
                body.put_u32(c.in_errors);
                body.put_u32(c.in_unknown_protos);
                body.put_u64(c.out_octets);
                body.put_u32(c.out_ucast_pkts);
                body.put_u32(c.out_multicast_pkts);
                body.put_u32(c.out_broadcast_pkts);
                body.put_u32(c.out_discards);
                body.put_u32(c.out_errors);
                body.put_u32(c.promiscuous_mode);
                body.freeze()
            }
            CounterRecordData::Unknown(b) => b.clone(),
        };
        buf.put_u32(join_data_format(record.enterprise, record.format));
        buf.put_u32(body.len() as u32);
        buf.put(body);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn flow_sample() -> FlowSample {
        FlowSample {
            sequence_number: 17,
            source_id_type: 0,
            source_id_index: 3,
            sampling_rate: 1024,
            sample_pool: 65536,
            drops: 0,
            input_format: 0,
            input: 3,
            output_format: 0,
            output: 4,
            records: vec![
                FlowRecord {
                    enterprise: 0,
                    format: 1,
                    data: FlowRecordData::RawPacketHeader(RawPacketHeader {
                        protocol: 1,
                        frame_length: 64,
                        stripped: 4,
                        header: Bytes::from_static(&[0xaa; 14]),
                    }),
                },
                FlowRecord {
                    enterprise: 0,
                    format: 1001,
                    data: FlowRecordData::Unknown(Bytes::from_static(&[0, 0, 0, 5, 0, 0, 0, 0])),
                },
            ],
        }
    }

    fn counter_sample() -> CounterSample {
        CounterSample {
            sequence_number: 9,
            source_id_type: 0,
            source_id_index: 3,
            records: vec![CounterRecord {
                enterprise: 0,
                format: 1,
                data: CounterRecordData::GenericInterface(GenericInterfaceCounters {
                    if_index: 3,
                    if_type: 6,
                    if_speed: 10_000_000_000,
                    if_direction: 1,
                    if_status: 3,
                    in_octets: 1 << 40,
                    in_ucast_pkts: 1000,
                    out_octets: 2 << 40,
                    out_ucast_pkts: 2000,
                    ..Default::default()
                }),
            }],
        }
    }

    fn packet(samples: Vec<SflowSample>) -> SflowPacket {
        SflowPacket {
            version: 5,
            agent_address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            sub_agent_id: 0,
            sequence_number: 100,
            sys_uptime: 360_000,
            sample_count: samples.len() as u32,
            samples,
        }
    }

    #[test]
    fn test_parse_header() {
        let mut data = packet(vec![]).encode();
        assert_eq!(data.len(), 28);
        let parsed = parse_sflow_packet(&mut data, SflowMode::Strict).unwrap();
        assert_eq!(parsed.agent_address_type(), AgentAddressType::Ipv4);
        assert_eq!(parsed.sequence_number, 100);
        assert!(parsed.samples.is_empty());
    }

    #[test]
    fn test_parse_samples() {
        let original = packet(vec![
            SflowSample::Flow(flow_sample()),
            SflowSample::Counter(counter_sample()),
            SflowSample::ExpandedFlow(flow_sample()),
            SflowSample::ExpandedCounter(counter_sample()),
            SflowSample::Unknown {
                enterprise: 4413,
                format: 7,
                data: Bytes::from_static(&[1, 2, 3, 4]),
            },
        ]);
        let mut data = original.encode();
        let parsed = parse_sflow_packet(&mut data, SflowMode::Strict).unwrap();
        assert_eq!(parsed, original);

        match &parsed.samples[0] {
            SflowSample::Flow(sample) => match &sample.records[0].data {
                FlowRecordData::RawPacketHeader(h) => assert_eq!(h.header.len(), 14),
                other => panic!("unexpected record {:?}", other),
            },
            other => panic!("unexpected sample {:?}", other),
        }
    }

    #[test]
    fn test_ipv6_agent() {
        let mut original = packet(vec![SflowSample::Counter(counter_sample())]);
        original.agent_address = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let mut data = original.encode();
        assert_eq!(
            parse_sflow_packet(&mut data, SflowMode::Lenient).unwrap(),
            original
        );
    }

    #[test]
    fn test_trailing_partial_sample() {
        let full = packet(vec![
            SflowSample::Counter(counter_sample()),
            SflowSample::Flow(flow_sample()),
        ])
        .encode();
        let truncated = full.slice(..full.len() - 10);

        let parsed = parse_sflow_packet(&mut truncated.clone(), SflowMode::Lenient).unwrap();
        assert_eq!(parsed.sample_count, 2);
        assert_eq!(parsed.samples.len(), 1);

        assert!(matches!(
            parse_sflow_packet(&mut truncated.clone(), SflowMode::Strict),
            Err(ParserSflowError::TrailingBytes { .. })
        ));

        // fewer bytes than a sample header
        let mut short = full.slice(..28 + 5);
        assert!(matches!(
            parse_sflow_packet(&mut short, SflowMode::Strict),
            Err(ParserSflowError::TrailingBytes { remaining: 5 })
        ));
    }

    #[test]
    fn test_strict_rejects_every_prefix() {
        let full = packet(vec![
            SflowSample::Counter(counter_sample()),
            SflowSample::Counter(counter_sample()),
        ])
        .encode();

        // cut right after the header and right after the first sample
        let first_sample_end =
            28 + SAMPLE_HEADER_LEN + encode_counter_sample(&counter_sample(), false).len();
        for n in [28, first_sample_end] {
            assert!(matches!(
                parse_sflow_packet(&mut full.slice(..n), SflowMode::Strict),
                Err(ParserSflowError::SampleCountMismatch { declared: 2, .. })
            ));
        }
        for n in 0..full.len() {
            assert!(
                parse_sflow_packet(&mut full.slice(..n), SflowMode::Strict).is_err(),
                "prefix of {} bytes decoded",
                n
            );
        }
        assert!(parse_sflow_packet(&mut full.clone(), SflowMode::Strict).is_ok());

        let lenient = parse_sflow_packet(&mut full.slice(..first_sample_end), SflowMode::Lenient)
            .unwrap();
        assert_eq!(lenient.sample_count, 2);
        assert_eq!(lenient.samples.len(), 1);
    }

    #[test]
    fn test_invalid_header() {
        let mut data = BytesMut::new();
        data.put_u32(4);
        assert!(matches!(
            parse_sflow_packet(&mut data.freeze(), SflowMode::Lenient),
            Err(ParserSflowError::UnsupportedVersion(4))
        ));

        let mut data = BytesMut::new();
        data.put_u32(5);
        data.put_u32(3);
        assert!(matches!(
            parse_sflow_packet(&mut data.freeze(), SflowMode::Lenient),
            Err(ParserSflowError::ParseError(
                ParserError::UnrecognizedEnumVariant {
                    type_name: "AgentAddressType",
                    value: 3
                }
            ))
        ));

        let mut short = packet(vec![]).encode().slice(..20);
        let err = parse_sflow_packet(&mut short, SflowMode::Lenient).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_record_overruns_sample() {
        let mut sample = BytesMut::new();
        sample.put_u32(1); // sequence
        sample.put_u32(3); // source id
        sample.put_u32(1); // record count
        sample.put_u32(1); // generic interface counters
        sample.put_u32(88); // but no record body follows

        let mut data = BytesMut::from(packet(vec![]).encode().as_ref());
        data.put_u32(join_data_format(0, 2));
        data.put_u32(sample.len() as u32);
        data.put(sample);
        assert!(matches!(
            parse_sflow_packet(&mut data.freeze(), SflowMode::Lenient),
            Err(ParserSflowError::ParseError(ParserError::TruncatedMsg(_)))
        ));
    }
}
