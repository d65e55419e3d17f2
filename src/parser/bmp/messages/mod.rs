//! BMP message parsing.
//!
//! <https://datatracker.ietf.org/doc/html/rfc7854>

pub use headers::*;
pub use initiation_message::*;
pub use peer_down_notification::*;
pub use peer_up_notification::*;
pub use route_mirroring::*;
pub use route_monitoring::*;
pub use stats_report::*;
pub use termination_message::*;

pub(crate) mod headers;
pub(crate) mod initiation_message;
pub(crate) mod peer_down_notification;
pub(crate) mod peer_up_notification;
pub(crate) mod route_mirroring;
pub(crate) mod route_monitoring;
pub(crate) mod stats_report;
pub(crate) mod termination_message;

use crate::error::ParserError;
use crate::models::BmpMsgType;
use crate::parser::ReadUtils;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// One decoded BMP message body.
///
/// Every variant except [BmpMessage::Initiation] and [BmpMessage::Termination] carries its
/// per-peer header inside the body struct.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BmpMessage {
    RouteMonitoring(RouteMonitoring),
    StatsReport(StatsReport),
    PeerDownNotification(PeerDownNotification),
    PeerUpNotification(PeerUpNotification),
    Initiation(InitiationMessage),
    Termination(TerminationMessage),
    RouteMirroring(RouteMirroring),
}

impl BmpMessage {
    pub fn msg_type(&self) -> BmpMsgType {
        match self {
            BmpMessage::RouteMonitoring(_) => BmpMsgType::RouteMonitoring,
            BmpMessage::StatsReport(_) => BmpMsgType::StatisticsReport,
            BmpMessage::PeerDownNotification(_) => BmpMsgType::PeerDownNotification,
            BmpMessage::PeerUpNotification(_) => BmpMsgType::PeerUpNotification,
            BmpMessage::Initiation(_) => BmpMsgType::InitiationMessage,
            BmpMessage::Termination(_) => BmpMsgType::TerminationMessage,
            BmpMessage::RouteMirroring(_) => BmpMsgType::RouteMirroringMessage,
        }
    }

    pub fn per_peer_header(&self) -> Option<&BmpPerPeerHeader> {
        match self {
            BmpMessage::RouteMonitoring(m) => Some(&m.per_peer_header),
            BmpMessage::StatsReport(m) => Some(&m.per_peer_header),
            BmpMessage::PeerDownNotification(m) => Some(&m.per_peer_header),
            BmpMessage::PeerUpNotification(m) => Some(&m.per_peer_header),
            BmpMessage::RouteMirroring(m) => Some(&m.per_peer_header),
            BmpMessage::Initiation(_) | BmpMessage::Termination(_) => None,
        }
    }

    /// Encode the body, per-peer header included, without the common header.
    pub fn encode(&self) -> Bytes {
        match self {
            BmpMessage::RouteMonitoring(m) => m.encode(),
            BmpMessage::StatsReport(m) => m.encode(),
            BmpMessage::PeerDownNotification(m) => m.encode(),
            BmpMessage::PeerUpNotification(m) => m.encode(),
            BmpMessage::Initiation(m) => m.encode(),
            BmpMessage::Termination(m) => m.encode(),
            BmpMessage::RouteMirroring(m) => m.encode(),
        }
    }
}

/// Split a bounded body into raw `(type, value)` information TLVs.
///
/// Any TLV header or value that runs past the end of `data` is a truncation error.
pub(crate) fn parse_raw_tlvs(data: &mut Bytes, what: &str) -> Result<Vec<(u16, Bytes)>, ParserError> {
    let mut tlvs = vec![];
    while data.has_remaining() {
        if data.remaining() < 4 {
            return Err(ParserError::TruncatedMsg(format!(
                "{} TLV header needs 4 bytes, {} left",
                what,
                data.remaining()
            )));
        }
        let info_type = data.read_u16()?;
        let info_len = data.read_u16()?;
        let value = data.read_bounded(info_len as usize, what)?;
        tlvs.push((info_type, value));
    }
    Ok(tlvs)
}

pub(crate) fn put_tlv(buf: &mut BytesMut, info_type: u16, value: &[u8]) {
    buf.put_u16(info_type);
    buf.put_u16(value.len() as u16);
    buf.put_slice(value);
}
