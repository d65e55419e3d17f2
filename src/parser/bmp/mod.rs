/*!
Provides parsing and encoding for BMP (RFC 7854) binary-formatted messages.
*/
use crate::models::*;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::*;
use crate::parser::ReadUtils;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub mod error;
pub mod messages;

/// One complete BMP message: the common header fields plus the decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BmpPacket {
    pub version: BmpVersion,
    /// Total length on the wire, common header included.
    pub length: u32,
    pub msg_type: BmpMsgType,
    pub message: BmpMessage,
}

impl BmpPacket {
    /// Wrap a message body, computing the length and type the common header will carry.
    pub fn new(message: BmpMessage) -> Self {
        let length = (BMP_COMMON_HEADER_LEN + message.encode().len()) as u32;
        BmpPacket {
            version: BmpVersion::Bmp3,
            length,
            msg_type: message.msg_type(),
            message,
        }
    }

    pub fn per_peer_header(&self) -> Option<&BmpPerPeerHeader> {
        self.message.per_peer_header()
    }

    pub fn encode(&self) -> Bytes {
        let body = self.message.encode();
        let header = BmpCommonHeader {
            version: self.version,
            msg_len: (BMP_COMMON_HEADER_LEN + body.len()) as u32,
            msg_type: self.msg_type,
        };
        let mut buf = BytesMut::with_capacity(BMP_COMMON_HEADER_LEN + body.len());
        buf.put(header.encode());
        buf.put(body);
        buf.freeze()
    }
}

/// Parse one BMP message from the front of `data`.
///
/// On success exactly `length` bytes are consumed. If `data` holds fewer bytes than the
/// common header declares, the error reports [ParserBmpError::is_insufficient_data] and the
/// caller may retry with more input. Everything after the common header is decoded from a
/// slice bounded by the declared length: overrunning it is a truncation error, and stopping
/// short of it is [ParserBmpError::LengthMismatch].
pub fn parse_bmp_packet(data: &mut Bytes) -> Result<BmpPacket, ParserBmpError> {
    let common_header = parse_bmp_common_header(data)?;
    let body_len = common_header.msg_len as usize - BMP_COMMON_HEADER_LEN;
    data.has_n_remaining(body_len)?;
    let mut body = data.split_to(body_len);

    let message =
        parse_bmp_body(common_header.msg_type, &mut body).map_err(ParserBmpError::body_overrun)?;

    if body.has_remaining() {
        return Err(ParserBmpError::LengthMismatch {
            declared: common_header.msg_len,
            consumed: BMP_COMMON_HEADER_LEN + body_len - body.remaining(),
        });
    }

    Ok(BmpPacket {
        version: common_header.version,
        length: common_header.msg_len,
        msg_type: common_header.msg_type,
        message,
    })
}

fn parse_bmp_body(msg_type: BmpMsgType, body: &mut Bytes) -> Result<BmpMessage, ParserBmpError> {
    let message = match msg_type {
        BmpMsgType::RouteMonitoring => {
            let per_peer_header = parse_per_peer_header(body)?;
            BmpMessage::RouteMonitoring(parse_route_monitoring(body, per_peer_header)?)
        }
        BmpMsgType::StatisticsReport => {
            let per_peer_header = parse_per_peer_header(body)?;
            BmpMessage::StatsReport(parse_stats_report(body, per_peer_header)?)
        }
        BmpMsgType::PeerDownNotification => {
            let per_peer_header = parse_per_peer_header(body)?;
            BmpMessage::PeerDownNotification(parse_peer_down_notification(body, per_peer_header)?)
        }
        BmpMsgType::PeerUpNotification => {
            let per_peer_header = parse_per_peer_header(body)?;
            BmpMessage::PeerUpNotification(parse_peer_up_notification(body, per_peer_header)?)
        }
        BmpMsgType::InitiationMessage => BmpMessage::Initiation(parse_initiation_message(body)?),
        BmpMsgType::TerminationMessage => {
            BmpMessage::Termination(parse_termination_message(body)?)
        }
        BmpMsgType::RouteMirroringMessage => {
            let per_peer_header = parse_per_peer_header(body)?;
            BmpMessage::RouteMirroring(parse_route_mirroring(body, per_peer_header)?)
        }
    };
    Ok(message)
}
