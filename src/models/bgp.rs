//! BGP messages as carried inside BMP bodies.
//!
//! The collector frames BGP PDUs (marker, length, type) but keeps their bodies opaque:
//! interpreting path attributes and NLRI is left to the listeners.
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// BGP message header length: 16 bytes marker, 2 bytes length, 1 byte type.
pub const BGP_HEADER_LEN: usize = 19;
/// Maximum BGP message length without the extended message capability.
pub const BGP_MAX_MESSAGE_LEN: usize = 4096;

/// BGP message type.
///
/// <https://www.iana.org/assignments/bgp-parameters/bgp-parameters.xhtml#bgp-parameters-1>
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BgpMessageType {
    Open = 1,
    Update = 2,
    Notification = 3,
    KeepAlive = 4,
    RouteRefresh = 5,
}

/// One framed BGP message.
///
/// `body` holds everything after the 19-byte header, so `body.len() + 19` is the length
/// field found on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BgpPdu {
    pub msg_type: BgpMessageType,
    pub body: Bytes,
}

impl BgpPdu {
    pub fn new(msg_type: BgpMessageType, body: impl Into<Bytes>) -> Self {
        BgpPdu {
            msg_type,
            body: body.into(),
        }
    }

    /// Total encoded length including the header.
    pub fn wire_len(&self) -> usize {
        BGP_HEADER_LEN + self.body.len()
    }

    /// An UPDATE with no withdrawn routes, no attributes and no NLRI: the IPv4 End-of-RIB marker.
    pub fn is_end_of_rib(&self) -> bool {
        self.msg_type == BgpMessageType::Update && self.body.as_ref() == [0, 0, 0, 0]
    }
}
