use crate::models::*;
use crate::parser::bgp::parse_bgp_pdu;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::BmpPerPeerHeader;
use crate::parser::ReadUtils;
use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerDownNotification {
    pub per_peer_header: BmpPerPeerHeader,
    pub reason: PeerDownReason,
    pub data: PeerDownData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerDownData {
    /// NOTIFICATION PDU sent (reason 1) or received (reason 3).
    Notification(BgpPdu),
    /// FSM event that closed the session (reason 2), 0 when no event applies.
    FsmEventCode(u16),
    None,
}

impl PeerDownNotification {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put(self.per_peer_header.encode());
        buf.put_u8(self.reason.into());
        match &self.data {
            PeerDownData::Notification(pdu) => buf.put(pdu.encode()),
            PeerDownData::FsmEventCode(code) => buf.put_u16(*code),
            PeerDownData::None => {}
        }
        buf.freeze()
    }
}

pub fn parse_peer_down_notification(
    data: &mut Bytes,
    per_peer_header: BmpPerPeerHeader,
) -> Result<PeerDownNotification, ParserBmpError> {
    let reason = PeerDownReason::try_from(data.read_u8()?)?;
    let down_data = match reason {
        PeerDownReason::LocalNotification | PeerDownReason::RemoteNotification => {
            /*
            The session was closed with a notification message.  Following the
            Reason is a BGP PDU containing the BGP NOTIFICATION message as sent
            to or received from the peer.
             */
            let pdu = parse_bgp_pdu(data)?;
            if pdu.msg_type != BgpMessageType::Notification {
                return Err(ParserBmpError::UnexpectedBgpMessage {
                    expected: BgpMessageType::Notification,
                    found: pdu.msg_type,
                });
            }
            PeerDownData::Notification(pdu)
        }
        PeerDownReason::LocalNoNotification => {
            /*
            The local system closed the session.  No notification
            message was sent.  Following the reason code is a 2-byte field
            containing the code corresponding to the Finite State Machine
            (FSM) Event that caused the system to close the session (see
            Section 8.1 of [RFC4271]).  Two bytes both set to 0 are used to
            indicate that no relevant Event code is defined.
             */
            PeerDownData::FsmEventCode(data.read_u16()?)
        }
        PeerDownReason::RemoteNoNotification | PeerDownReason::PeerDeConfigured => {
            PeerDownData::None
        }
    };
    Ok(PeerDownNotification {
        per_peer_header,
        reason,
        data: down_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;
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
    fn test_parse_peer_down_notification() {
        // Test with reason `1`
        let notification = BgpPdu::new(BgpMessageType::Notification, vec![6u8, 2]);
        let mut data = BytesMut::new();
        data.put_u8(1);
        data.put(notification.encode());
        let msg = parse_peer_down_notification(&mut data.freeze(), peer()).unwrap();
        assert_eq!(msg.reason, PeerDownReason::LocalNotification);
        assert_eq!(msg.data, PeerDownData::Notification(notification.clone()));

        // Test with reason `2`
        let mut data = BytesMut::new();
        data.put_u8(2);
        data.put_u16(24);
        let msg = parse_peer_down_notification(&mut data.freeze(), peer()).unwrap();
        assert_eq!(msg.data, PeerDownData::FsmEventCode(24));

        // Test with reason `3`
        let mut data = BytesMut::new();
        data.put_u8(3);
        data.put(notification.encode());
        let msg = parse_peer_down_notification(&mut data.freeze(), peer()).unwrap();
        assert_eq!(msg.reason, PeerDownReason::RemoteNotification);

        // Test with reason `4` and `5`
        for reason in [4u8, 5] {
            let mut data = Bytes::copy_from_slice(&[reason]);
            let msg = parse_peer_down_notification(&mut data, peer()).unwrap();
            assert_eq!(msg.data, PeerDownData::None);
            assert!(data.is_empty());
        }
    }

    #[test]
    fn test_invalid_reason() {
        for reason in [0u8, 6, 255] {
            let mut data = Bytes::copy_from_slice(&[reason]);
            assert!(matches!(
                parse_peer_down_notification(&mut data, peer()),
                Err(ParserBmpError::ParseError(
                    ParserError::UnrecognizedEnumVariant {
                        type_name: "PeerDownReason",
                        ..
                    }
                ))
            ));
        }
    }

    #[test]
    fn test_notification_reason_requires_notification_pdu() {
        let mut data = BytesMut::new();
        data.put_u8(3);
        data.put(BgpPdu::new(BgpMessageType::KeepAlive, Bytes::new()).encode());
        assert!(matches!(
            parse_peer_down_notification(&mut data.freeze(), peer()),
            Err(ParserBmpError::UnexpectedBgpMessage { .. })
        ));
    }

    #[test]
    fn test_encode() {
        let msg = PeerDownNotification {
            per_peer_header: peer(),
            reason: PeerDownReason::LocalNoNotification,
            data: PeerDownData::FsmEventCode(0),
        };
        let mut encoded = msg.encode();
        let per_peer_header = crate::parser::bmp::messages::parse_per_peer_header(&mut encoded).unwrap();
        assert_eq!(
            parse_peer_down_notification(&mut encoded, per_peer_header).unwrap(),
            msg
        );
    }
}
