use crate::models::*;
use crate::parser::bgp::parse_bgp_pdu;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::headers::put_padded_address;
use crate::parser::bmp::messages::{parse_raw_tlvs, put_tlv, BmpPerPeerHeader};
use crate::parser::ReadUtils;
use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerUpNotification {
    pub per_peer_header: BmpPerPeerHeader,
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub remote_port: u16,
    pub sent_open: BgpPdu,
    pub received_open: BgpPdu,
    pub tlvs: Vec<PeerUpNotificationTlv>,
}

///Type-Length-Value Type
///
/// https://www.iana.org/assignments/bmp-parameters/bmp-parameters.xhtml#initiation-peer-up-tlvs
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum PeerUpTlvType {
    String = 0,
    SysDescr = 1,
    SysName = 2,
    VrTableName = 3,
    AdminLabel = 4,
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerUpNotificationTlv {
    pub info_type: PeerUpTlvType,
    pub info_value: String,
}

impl PeerUpNotification {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put(self.per_peer_header.encode());
        put_padded_address(&mut buf, &self.local_addr);
        buf.put_u16(self.local_port);
        buf.put_u16(self.remote_port);
        buf.put(self.sent_open.encode());
        buf.put(self.received_open.encode());
        for tlv in &self.tlvs {
            put_tlv(&mut buf, tlv.info_type.into(), tlv.info_value.as_bytes());
        }
        buf.freeze()
    }
}

/// Parse BMP peer up notification
///
/// The local address family follows the per-peer header's IPv6 flag.
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.10>
pub fn parse_peer_up_notification(
    data: &mut Bytes,
    per_peer_header: BmpPerPeerHeader,
) -> Result<PeerUpNotification, ParserBmpError> {
    let local_addr = data
        .read_padded_address(per_peer_header.is_ipv6())?
        .ok_or(ParserBmpError::AddressFamilyMismatch)?;

    let local_port = data.read_u16()?;
    let remote_port = data.read_u16()?;

    let sent_open = parse_open(data)?;
    let received_open = parse_open(data)?;

    let mut tlvs = vec![];
    for (info_type, value) in parse_raw_tlvs(data, "peer up")? {
        tlvs.push(PeerUpNotificationTlv {
            info_type: PeerUpTlvType::try_from(info_type)?,
            info_value: String::from_utf8_lossy(&value).into_owned(),
        })
    }
    Ok(PeerUpNotification {
        per_peer_header,
        local_addr,
        local_port,
        remote_port,
        sent_open,
        received_open,
        tlvs,
    })
}

fn parse_open(data: &mut Bytes) -> Result<BgpPdu, ParserBmpError> {
    let pdu = parse_bgp_pdu(data)?;
    if pdu.msg_type != BgpMessageType::Open {
        return Err(ParserBmpError::UnexpectedBgpMessage {
            expected: BgpMessageType::Open,
            found: pdu.msg_type,
        });
    }
    Ok(pdu)
}
