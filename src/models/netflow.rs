//! NetFlow version 9 structures.
//!
//! <https://www.rfc-editor.org/rfc/rfc3954>
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub const NETFLOW_VERSION_9: u16 = 9;

/// How the bytes of a field are interpreted.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FieldKind {
    /// Big-endian unsigned integer of 1 to 8 bytes.
    Unsigned,
    Ipv4,
    Ipv6,
    Mac,
    /// Text, possibly NUL padded.
    String,
    Opaque,
}

/// NetFlow v9 field type registry.
///
/// <https://www.iana.org/assignments/ipfix/ipfix.xhtml> (codes 1-104 match the v9 definitions)
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum FlowField {
    InBytes = 1,
    InPkts = 2,
    Flows = 3,
    Protocol = 4,
    SrcTos = 5,
    TcpFlags = 6,
    L4SrcPort = 7,
    Ipv4SrcAddr = 8,
    SrcMask = 9,
    InputSnmp = 10,
    L4DstPort = 11,
    Ipv4DstAddr = 12,
    DstMask = 13,
    OutputSnmp = 14,
    Ipv4NextHop = 15,
    SrcAs = 16,
    DstAs = 17,
    BgpIpv4NextHop = 18,
    MulDstPkts = 19,
    MulDstBytes = 20,
    LastSwitched = 21,
    FirstSwitched = 22,
    OutBytes = 23,
    OutPkts = 24,
    MinPktLength = 25,
    MaxPktLength = 26,
    Ipv6SrcAddr = 27,
    Ipv6DstAddr = 28,
    Ipv6SrcMask = 29,
    Ipv6DstMask = 30,
    Ipv6FlowLabel = 31,
    IcmpType = 32,
    MulIgmpType = 33,
    SamplingInterval = 34,
    SamplingAlgorithm = 35,
    FlowActiveTimeout = 36,
    FlowInactiveTimeout = 37,
    EngineType = 38,
    EngineId = 39,
    TotalBytesExp = 40,
    TotalPktsExp = 41,
    TotalFlowsExp = 42,
    Ipv4SrcPrefix = 44,
    Ipv4DstPrefix = 45,
    MplsTopLabelType = 46,
    MplsTopLabelIpAddr = 47,
    FlowSamplerId = 48,
    FlowSamplerMode = 49,
    FlowSamplerRandomInterval = 50,
    MinTtl = 52,
    MaxTtl = 53,
    Ipv4Ident = 54,
    DstTos = 55,
    InSrcMac = 56,
    OutDstMac = 57,
    SrcVlan = 58,
    DstVlan = 59,
    IpProtocolVersion = 60,
    Direction = 61,
    Ipv6NextHop = 62,
    BgpIpv6NextHop = 63,
    Ipv6OptionHeaders = 64,
    MplsLabel1 = 70,
    MplsLabel2 = 71,
    MplsLabel3 = 72,
    MplsLabel4 = 73,
    MplsLabel5 = 74,
    MplsLabel6 = 75,
    MplsLabel7 = 76,
    MplsLabel8 = 77,
    MplsLabel9 = 78,
    MplsLabel10 = 79,
    InDstMac = 80,
    OutSrcMac = 81,
    IfName = 82,
    IfDesc = 83,
    SamplerName = 84,
    InPermanentBytes = 85,
    InPermanentPkts = 86,
    FragmentOffset = 88,
    ForwardingStatus = 89,
    MplsPalRd = 90,
    MplsPrefixLen = 91,
    SrcTrafficIndex = 92,
    DstTrafficIndex = 93,
    ApplicationDescription = 94,
    ApplicationTag = 95,
    ApplicationName = 96,
    PostIpDiffServCodePoint = 98,
    ReplicationFactor = 99,
    Layer2PacketSectionOffset = 102,
    Layer2PacketSectionSize = 103,
    Layer2PacketSectionData = 104,
}

impl FlowField {
    pub const fn kind(&self) -> FieldKind {
        use FlowField::*;
        match self {
            Ipv4SrcAddr | Ipv4DstAddr | Ipv4NextHop | BgpIpv4NextHop | Ipv4SrcPrefix
            | Ipv4DstPrefix | MplsTopLabelIpAddr => FieldKind::Ipv4,
            Ipv6SrcAddr | Ipv6DstAddr | Ipv6NextHop | BgpIpv6NextHop => FieldKind::Ipv6,
            InSrcMac | OutDstMac | InDstMac | OutSrcMac => FieldKind::Mac,
            IfName | IfDesc | SamplerName | ApplicationDescription | ApplicationName => {
                FieldKind::String
            }
            MplsPalRd | ApplicationTag | Layer2PacketSectionData => FieldKind::Opaque,
            _ => FieldKind::Unsigned,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowValue {
    Unsigned(u64),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Mac([u8; 6]),
    String(String),
    Bytes(Bytes),
}

impl FlowValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FlowValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            FlowValue::Ipv4(v) => Some(IpAddr::V4(*v)),
            FlowValue::Ipv6(v) => Some(IpAddr::V6(*v)),
            _ => None,
        }
    }
}

/// Options template scope type.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum ScopeType {
    System = 1,
    Interface = 2,
    LineCard = 3,
    Cache = 4,
    Template = 5,
}

/// A field declared by a template, with the byte length the exporter chose for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowTemplateField {
    pub field: FlowField,
    pub length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeTemplateField {
    pub scope: ScopeType,
    pub length: u16,
}

/// Template or options template.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Template {
    pub template_id: u16,
    /// Empty for plain templates.
    pub scope_fields: Vec<ScopeTemplateField>,
    pub fields: Vec<FlowTemplateField>,
}

impl Template {
    pub fn is_options_template(&self) -> bool {
        !self.scope_fields.is_empty()
    }

    /// Length of one data record described by this template.
    pub fn record_len(&self) -> usize {
        self.scope_fields
            .iter()
            .map(|f| f.length as usize)
            .chain(self.fields.iter().map(|f| f.length as usize))
            .sum()
    }
}

/// One decoded field of a data record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flow {
    pub field: FlowField,
    pub value: FlowValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataRecord {
    pub scopes: Vec<(ScopeType, Bytes)>,
    pub flows: Vec<Flow>,
}

impl DataRecord {
    pub fn get(&self, field: FlowField) -> Option<&FlowValue> {
        self.flows.iter().find(|f| f.field == field).map(|f| &f.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowSet {
    Template(Vec<Template>),
    OptionsTemplate(Vec<Template>),
    Data {
        template_id: u16,
        records: Vec<DataRecord>,
    },
}

/// NetFlow v9 packet header, 20 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetflowHeader {
    pub version: u16,
    /// Number of records (template and data) in the packet, as announced by the exporter.
    pub count: u16,
    pub sys_uptime: u32,
    pub unix_secs: u32,
    pub sequence_number: u32,
    pub source_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetflowPacket {
    pub header: NetflowHeader,
    pub flowsets: Vec<FlowSet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_registry() {
        assert_eq!(FlowField::try_from(8u16).unwrap(), FlowField::Ipv4SrcAddr);
        assert_eq!(FlowField::Ipv4SrcAddr.kind(), FieldKind::Ipv4);
        assert_eq!(FlowField::Ipv6DstAddr.kind(), FieldKind::Ipv6);
        assert_eq!(FlowField::InSrcMac.kind(), FieldKind::Mac);
        assert_eq!(FlowField::InBytes.kind(), FieldKind::Unsigned);
        assert_eq!(FlowField::IfName.kind(), FieldKind::String);
        // vendor-reserved codes are not in the registry
        assert!(FlowField::try_from(43u16).is_err());
        assert!(FlowField::try_from(0u16).is_err());
    }

    #[test]
    fn test_record_len() {
        let template = Template {
            template_id: 256,
            scope_fields: vec![ScopeTemplateField {
                scope: ScopeType::System,
                length: 4,
            }],
            fields: vec![
                FlowTemplateField {
                    field: FlowField::InBytes,
                    length: 4,
                },
                FlowTemplateField {
                    field: FlowField::Ipv6SrcAddr,
                    length: 16,
                },
            ],
        };
        assert!(template.is_options_template());
        assert_eq!(template.record_len(), 24);
    }
}
