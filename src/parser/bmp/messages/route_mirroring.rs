use crate::error::ParserError;
use crate::models::*;
use crate::parser::bgp::parse_bgp_pdu;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::{parse_raw_tlvs, put_tlv, BmpPerPeerHeader};
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteMirroring {
    pub per_peer_header: BmpPerPeerHeader,
    pub tlvs: Vec<RouteMirroringTlv>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteMirroringTlv {
    BgpMessage(BgpPdu),
    Information(MirroringType),
}

impl RouteMirroring {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put(self.per_peer_header.encode());
        for tlv in &self.tlvs {
            match tlv {
                RouteMirroringTlv::BgpMessage(pdu) => {
                    put_tlv(&mut buf, RouteMirroringTlvType::BgpMessage.into(), &pdu.encode())
                }
                RouteMirroringTlv::Information(info) => {
                    let code: u16 = (*info).into();
                    put_tlv(
                        &mut buf,
                        RouteMirroringTlvType::Information.into(),
                        &code.to_be_bytes(),
                    )
                }
            }
        }
        buf.freeze()
    }
}

/// Parse BMP route mirroring message
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.7>
pub fn parse_route_mirroring(
    data: &mut Bytes,
    per_peer_header: BmpPerPeerHeader,
) -> Result<RouteMirroring, ParserBmpError> {
    let mut tlvs = vec![];
    for (info_type, mut value) in parse_raw_tlvs(data, "route mirroring")? {
        let tlv = match RouteMirroringTlvType::try_from(info_type)? {
            RouteMirroringTlvType::BgpMessage => {
                let pdu = parse_bgp_pdu(&mut value)?;
                if value.has_remaining() {
                    return Err(ParserError::InvalidField(format!(
                        "{} trailing bytes after mirrored BGP message",
                        value.remaining()
                    ))
                    .into());
                }
                RouteMirroringTlv::BgpMessage(pdu)
            }
            RouteMirroringTlvType::Information => {
                if value.len() != 2 {
                    return Err(ParserError::InvalidField(format!(
                        "mirroring information must be 2 bytes, got {}",
                        value.len()
                    ))
                    .into());
                }
                RouteMirroringTlv::Information(MirroringType::try_from(value.get_u16())?)
            }
        };
        tlvs.push(tlv);
    }
    Ok(RouteMirroring {
        per_peer_header,
        tlvs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> BmpPerPeerHeader {
        BmpPerPeerHeader::new(
            PeerType::Global,
            PeerFlags::empty(),
            0,
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            65001,
            Ipv4Addr::new(192, 0, 2, 1),
            10,
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_route_mirroring() {
        let errored = BgpPdu::new(BgpMessageType::Update, vec![0u8, 0, 0, 1, 0xff]);
        let mut data = BytesMut::new();
        put_tlv(&mut data, 1, &[0, 0]);
        put_tlv(&mut data, 0, &errored.encode());
        let msg = parse_route_mirroring(&mut data.freeze(), peer()).unwrap();
        assert_eq!(
            msg.tlvs,
            vec![
                RouteMirroringTlv::Information(MirroringType::ErroredPdu),
                RouteMirroringTlv::BgpMessage(errored),
            ]
        );
    }

    #[test]
    fn test_unknown_mirroring_information() {
        let mut data = BytesMut::new();
        put_tlv(&mut data, 1, &[0, 2]);
        assert!(matches!(
            parse_route_mirroring(&mut data.freeze(), peer()),
            Err(ParserBmpError::ParseError(
                ParserError::UnrecognizedEnumVariant {
                    type_name: "MirroringType",
                    value: 2
                }
            ))
        ));
    }

    #[test]
    fn test_encode() {
        let msg = RouteMirroring {
            per_peer_header: peer(),
            tlvs: vec![RouteMirroringTlv::Information(MirroringType::MessagesLost)],
        };
        let mut encoded = msg.encode();
        let per_peer_header =
            crate::parser::bmp::messages::parse_per_peer_header(&mut encoded).unwrap();
        assert_eq!(parse_route_mirroring(&mut encoded, per_peer_header).unwrap(), msg);
    }
}
