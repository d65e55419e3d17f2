//! sFlow version 5 datagram structures.
//!
//! <https://sflow.org/sflow_version_5.txt>
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::IpAddr;

pub const SFLOW_VERSION_5: u32 = 5;

/// Agent address type in the datagram header.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum AgentAddressType {
    Ipv4 = 1,
    Ipv6 = 2,
}

/// Standard (enterprise 0) sample formats.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum SampleType {
    FlowSample = 1,
    CounterSample = 2,
    ExpandedFlowSample = 3,
    ExpandedCounterSample = 4,
}

/// Split a `data_format` word into `(enterprise, format)`: 20 high bits and 12 low bits.
#[inline]
pub fn split_data_format(data_format: u32) -> (u32, u32) {
    (data_format >> 12, data_format & 0x0fff)
}

#[inline]
pub fn join_data_format(enterprise: u32, format: u32) -> u32 {
    (enterprise << 12) | (format & 0x0fff)
}

/// One sFlow datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SflowPacket {
    pub version: u32,
    pub agent_address: IpAddr,
    pub sub_agent_id: u32,
    pub sequence_number: u32,
    /// Milliseconds since the agent booted.
    pub sys_uptime: u32,
    /// Sample count announced in the header; `samples.len()` may be lower in lenient mode.
    pub sample_count: u32,
    pub samples: Vec<SflowSample>,
}

impl SflowPacket {
    pub fn agent_address_type(&self) -> AgentAddressType {
        match self.agent_address {
            IpAddr::V4(_) => AgentAddressType::Ipv4,
            IpAddr::V6(_) => AgentAddressType::Ipv6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SflowSample {
    Flow(FlowSample),
    Counter(CounterSample),
    ExpandedFlow(FlowSample),
    ExpandedCounter(CounterSample),
    /// A sample this collector does not decode, kept as received.
    Unknown {
        enterprise: u32,
        format: u32,
        data: Bytes,
    },
}

/// Flow sample, compact (format 1) or expanded (format 3).
///
/// For the compact form the source id and interface words are split into their
/// type/format and value parts so both forms share this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowSample {
    pub sequence_number: u32,
    pub source_id_type: u32,
    pub source_id_index: u32,
    pub sampling_rate: u32,
    pub sample_pool: u32,
    pub drops: u32,
    pub input_format: u32,
    pub input: u32,
    pub output_format: u32,
    pub output: u32,
    pub records: Vec<FlowRecord>,
}

/// Counter sample, compact (format 2) or expanded (format 4).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterSample {
    pub sequence_number: u32,
    pub source_id_type: u32,
    pub source_id_index: u32,
    pub records: Vec<CounterRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowRecord {
    pub enterprise: u32,
    pub format: u32,
    pub data: FlowRecordData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowRecordData {
    RawPacketHeader(RawPacketHeader),
    Unknown(Bytes),
}

/// Flow record format 1: the first bytes of a sampled packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawPacketHeader {
    /// Header protocol, 1 = Ethernet, 11 = IPv4, 12 = IPv6, ...
    pub protocol: u32,
    pub frame_length: u32,
    pub stripped: u32,
    pub header: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterRecord {
    pub enterprise: u32,
    pub format: u32,
    pub data: CounterRecordData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CounterRecordData {
    GenericInterface(GenericInterfaceCounters),
    Unknown(Bytes),
}

/// Counter record format 1 (RFC 2233 interface counters), 88 bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenericInterfaceCounters {
    pub if_index: u32,
    pub if_type: u32,
    pub if_speed: u64,
    pub if_direction: u32,
    pub if_status: u32,
    pub in_octets: u64,
    pub in_ucast_pkts: u32,
    pub in_multicast_pkts: u32,
    pub in_broadcast_pkts: u32,
    pub in_discards: u32,
    pub in_errors: u32,
    pub in_unknown_protos: u32,
    pub out_octets: u64,
    pub out_ucast_pkts: u32,
    pub out_multicast_pkts: u32,
    pub out_broadcast_pkts: u32,
    pub out_discards: u32,
    pub out_errors: u32,
    pub promiscuous_mode: u32,
}
