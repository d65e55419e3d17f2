//! Closed BMP code points.
//!
//! Every enum here derives [TryFromPrimitive], so lookups are compile-time matches with no
//! runtime table. An out-of-range code converts into
//! [ParserError::UnrecognizedEnumVariant](crate::error::ParserError::UnrecognizedEnumVariant)
//! instead of falling back to a default variant.
//!
//! <https://www.iana.org/assignments/bmp-parameters/bmp-parameters.xhtml>
use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// BMP protocol version. RFC 7854 only defines version 3.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BmpVersion {
    Bmp3 = 3,
}

/// BMP message type enum.
///
/// ```text
///    o  Message Type (1 byte): This identifies the type of the BMP
///       message.  A BMP implementation MUST ignore unrecognized message
///       types upon receipt.
///
///       *  Type = 0: Route Monitoring
///       *  Type = 1: Statistics Report
///       *  Type = 2: Peer Down Notification
///       *  Type = 3: Peer Up Notification
///       *  Type = 4: Initiation Message
///       *  Type = 5: Termination Message
///       *  Type = 6: Route Mirroring Message
/// ```
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BmpMsgType {
    RouteMonitoring = 0,
    StatisticsReport = 1,
    PeerDownNotification = 2,
    PeerUpNotification = 3,
    InitiationMessage = 4,
    TerminationMessage = 5,
    RouteMirroringMessage = 6,
}

/// Peer type from the per-peer header.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PeerType {
    Global = 0,
    RD = 1,
    Local = 2,
}

bitflags! {
    /// Per-peer header flags.
    ///
    /// ```text
    ///  0 1 2 3 4 5 6 7
    /// +-+-+-+-+-+-+-+-+
    /// |V|L|A| Resv    |
    /// +-+-+-+-+-+-+-+-+
    /// ```
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PeerFlags: u8 {
        /// Peer address is IPv6.
        const ADDRESS_FAMILY_IPV6 = 0x80;
        /// Post-policy Adj-RIB-In.
        const POST_POLICY = 0x40;
        /// Legacy 2-byte AS_PATH format.
        const AS_SIZE_16BIT = 0x20;
    }
}

/// Reason code of a Peer Down Notification.
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.9>
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PeerDownReason {
    /// Local system closed the session, a NOTIFICATION PDU follows.
    LocalNotification = 1,
    /// Local system closed the session without a notification, an FSM event code follows.
    LocalNoNotification = 2,
    /// Remote system closed the session with a notification, the NOTIFICATION PDU follows.
    RemoteNotification = 3,
    RemoteNoNotification = 4,
    /// Peer de-configured, no more updates will be sent for it.
    PeerDeConfigured = 5,
}

/// Information code carried in a Route Mirroring information TLV.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum MirroringType {
    ErroredPdu = 0,
    MessagesLost = 1,
}

/// Route Mirroring TLV type.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum RouteMirroringTlvType {
    BgpMessage = 0,
    Information = 1,
}

/// Reason carried in a Termination message Reason TLV.
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.5>
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum TerminationReason {
    AdministrativelyClosed = 0,
    UnspecifiedReason = 1,
    OutOfResources = 2,
    RedundantConnection = 3,
    PermanentlyAdministrativelyClosed = 4,
}

///Type-Length-Value Type
///
/// For more, see: https://datatracker.ietf.org/doc/html/rfc1213
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum InitiationTlvType {
    String = 0,
    SysDescr = 1,
    SysName = 2,
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum TerminationTlvType {
    String = 0,
    Reason = 1,
}

/// Statistics Report counter types.
///
/// Unknown stat types are legal on the wire (RFC 7854 says to skip them), so stat
/// counters keep the raw code and this enum is an optional interpretation of it.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum StatType {
    PrefixesRejected = 0,
    DuplicatePrefixAdvertisements = 1,
    DuplicateWithdraws = 2,
    UpdatesInvalidatedClusterListLoop = 3,
    UpdatesInvalidatedAsPathLoop = 4,
    UpdatesInvalidatedOriginatorId = 5,
    UpdatesInvalidatedAsConfedLoop = 6,
    RoutesAdjRibIn = 7,
    RoutesLocRib = 8,
    RoutesPerAfiSafiAdjRibIn = 9,
    RoutesPerAfiSafiLocRib = 10,
    UpdatesTreatedAsWithdraw = 11,
    PrefixesTreatedAsWithdraw = 12,
    DuplicateUpdates = 13,
}
