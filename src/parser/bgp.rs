//! BGP message framing.
//!
//! <https://tools.ietf.org/html/rfc4271#section-4.1>
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ParserError;
use crate::models::*;
use crate::parser::ReadUtils;

const BGP_MARKER: [u8; 16] = [0xff; 16];

/// Parse one BGP message from the front of `data`.
///
/// `data` is expected to be a bounded BMP body slice, so a message that claims more bytes
/// than are left is reported as [ParserError::TruncatedMsg].
pub fn parse_bgp_pdu(data: &mut Bytes) -> Result<BgpPdu, ParserError> {
    let marker = data.read_n_bytes(16)?;
    if marker.as_ref() != BGP_MARKER {
        return Err(ParserError::InvalidField(
            "BGP message marker is not all ones".to_string(),
        ));
    }
    /*
     This 2-octet unsigned integer indicates the total length of the
     message, including the header in octets.  Thus, it allows one
     to locate the (Marker field of the) next message in the TCP
     stream.  The value of the Length field MUST always be at least
     19 and no greater than 4096, and MAY be further constrained,
     depending on the message type.
     */
    let length = data.read_u16()? as usize;
    if !(BGP_HEADER_LEN..=BGP_MAX_MESSAGE_LEN).contains(&length) {
        return Err(ParserError::InvalidField(format!(
            "invalid BGP message length {}",
            length
        )));
    }
    let msg_type = BgpMessageType::try_from(data.read_u8()?)?;
    let body = data.read_bounded(length - BGP_HEADER_LEN, "BGP message")?;
    Ok(BgpPdu { msg_type, body })
}

impl BgpPdu {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        buf.put_slice(&BGP_MARKER);
        buf.put_u16(self.wire_len() as u16);
        buf.put_u8(self.msg_type.into());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keepalive() {
        let mut data = BytesMut::new();
        data.put_slice(&BGP_MARKER);
        data.put_u16(19);
        data.put_u8(4);
        let mut data = data.freeze();
        let pdu = parse_bgp_pdu(&mut data).unwrap();
        assert_eq!(pdu.msg_type, BgpMessageType::KeepAlive);
        assert!(pdu.body.is_empty());
        assert!(data.is_empty());
    }

    #[test]
    fn test_end_of_rib() {
        let pdu = BgpPdu::new(BgpMessageType::Update, vec![0u8, 0, 0, 0]);
        let mut encoded = pdu.encode();
        assert_eq!(encoded.len(), 23);
        let parsed = parse_bgp_pdu(&mut encoded).unwrap();
        assert!(parsed.is_end_of_rib());
        assert_eq!(parsed, pdu);
    }

    #[test]
    fn test_invalid_pdus() {
        // bad marker
        let mut data = BytesMut::new();
        data.put_slice(&[0u8; 16]);
        data.put_u16(19);
        data.put_u8(4);
        assert!(matches!(
            parse_bgp_pdu(&mut data.freeze()),
            Err(ParserError::InvalidField(_))
        ));

        // length below header size
        let mut data = BytesMut::new();
        data.put_slice(&BGP_MARKER);
        data.put_u16(18);
        data.put_u8(4);
        assert!(matches!(
            parse_bgp_pdu(&mut data.freeze()),
            Err(ParserError::InvalidField(_))
        ));

        // unknown type
        let mut data = BytesMut::new();
        data.put_slice(&BGP_MARKER);
        data.put_u16(19);
        data.put_u8(9);
        assert!(matches!(
            parse_bgp_pdu(&mut data.freeze()),
            Err(ParserError::UnrecognizedEnumVariant { .. })
        ));

        // body shorter than declared
        let mut data = BytesMut::new();
        data.put_slice(&BGP_MARKER);
        data.put_u16(30);
        data.put_u8(2);
        data.put_slice(&[0u8; 5]);
        assert!(matches!(
            parse_bgp_pdu(&mut data.freeze()),
            Err(ParserError::TruncatedMsg(_))
        ));
    }
}
