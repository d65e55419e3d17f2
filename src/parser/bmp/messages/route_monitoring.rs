use crate::models::*;
use crate::parser::bgp::parse_bgp_pdu;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::BmpPerPeerHeader;
use bytes::{BufMut, Bytes, BytesMut};

/// Route Monitoring: one BGP UPDATE as received from (or sent to) the monitored peer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteMonitoring {
    pub per_peer_header: BmpPerPeerHeader,
    pub bgp_message: BgpPdu,
}

impl RouteMonitoring {
    #[inline]
    pub fn is_end_of_rib(&self) -> bool {
        self.bgp_message.is_end_of_rib()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put(self.per_peer_header.encode());
        buf.put(self.bgp_message.encode());
        buf.freeze()
    }
}

pub fn parse_route_monitoring(
    data: &mut Bytes,
    per_peer_header: BmpPerPeerHeader,
) -> Result<RouteMonitoring, ParserBmpError> {
    let bgp_message = parse_bgp_pdu(data)?;
    if bgp_message.msg_type != BgpMessageType::Update {
        return Err(ParserBmpError::UnexpectedBgpMessage {
            expected: BgpMessageType::Update,
            found: bgp_message.msg_type,
        });
    }
    Ok(RouteMonitoring {
        per_peer_header,
        bgp_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::bmp::messages::parse_per_peer_header;
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
    fn test_parse_route_monitoring() {
        let msg = RouteMonitoring {
            per_peer_header: peer(),
            bgp_message: BgpPdu::new(BgpMessageType::Update, vec![0u8, 0, 0, 0]),
        };
        let mut data = msg.encode();
        let per_peer_header = parse_per_peer_header(&mut data).unwrap();
        let parsed = parse_route_monitoring(&mut data, per_peer_header).unwrap();
        assert!(parsed.is_end_of_rib());
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_route_monitoring_requires_update() {
        let mut data = BgpPdu::new(BgpMessageType::KeepAlive, Bytes::new()).encode();
        assert!(matches!(
            parse_route_monitoring(&mut data, peer()),
            Err(ParserBmpError::UnexpectedBgpMessage {
                found: BgpMessageType::KeepAlive,
                ..
            })
        ));
    }
}
