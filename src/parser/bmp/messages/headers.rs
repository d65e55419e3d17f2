use crate::models::*;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::ReadUtils;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::{IpAddr, Ipv4Addr};

/// Length of the BMP common header.
pub const BMP_COMMON_HEADER_LEN: usize = 6;
/// Length of the BMP per-peer header.
pub const BMP_PER_PEER_HEADER_LEN: usize = 42;

/// BMP Common Header
///
/// ```text
///       0                   1                   2                   3
///       0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///      +-+-+-+-+-+-+-+-+
///      |    Version    |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |                        Message Length                         |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |   Msg. Type   |
///      +---------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BmpCommonHeader {
    pub version: BmpVersion,
    /// Total message length including this header.
    pub msg_len: u32,
    pub msg_type: BmpMsgType,
}

pub fn parse_bmp_common_header(data: &mut Bytes) -> Result<BmpCommonHeader, ParserBmpError> {
    let version = data.read_u8()?;
    // has to be 3 per rfc7854
    let version =
        BmpVersion::try_from(version).map_err(|_| ParserBmpError::UnsupportedVersion(version))?;

    let msg_len = data.read_u32()?;
    if (msg_len as usize) < BMP_COMMON_HEADER_LEN {
        return Err(ParserBmpError::InvalidMessageLength(msg_len));
    }

    let msg_type = BmpMsgType::try_from(data.read_u8()?)?;
    Ok(BmpCommonHeader {
        version,
        msg_len,
        msg_type,
    })
}

impl BmpCommonHeader {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(BMP_COMMON_HEADER_LEN);
        buf.put_u8(self.version.into());
        buf.put_u32(self.msg_len);
        buf.put_u8(self.msg_type.into());
        buf.freeze()
    }
}

/// BMP Per-peer Header
///
/// ```text
///       0                   1                   2                   3
///       0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |   Peer Type   |  Peer Flags   |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |         Peer Distinguisher (present based on peer type)       |
///      |                                                               |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |                 Peer Address (16 bytes)                       |
///      ~                                                               ~
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |                           Peer AS                             |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |                         Peer BGP ID                           |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |                    Timestamp (seconds)                        |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///      |                  Timestamp (microseconds)                     |
///      +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The address family of `peer_ip` always agrees with
/// [PeerFlags::ADDRESS_FAMILY_IPV6] for headers built by [parse_per_peer_header] or
/// [BmpPerPeerHeader::new].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BmpPerPeerHeader {
    pub peer_type: PeerType,
    pub peer_flags: PeerFlags,
    pub peer_distinguisher: u64,
    pub peer_ip: IpAddr,
    pub peer_asn: u32,
    pub peer_bgp_id: Ipv4Addr,
    pub timestamp_secs: u32,
    pub timestamp_micros: u32,
}

impl BmpPerPeerHeader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        peer_type: PeerType,
        peer_flags: PeerFlags,
        peer_distinguisher: u64,
        peer_ip: IpAddr,
        peer_asn: u32,
        peer_bgp_id: Ipv4Addr,
        timestamp_secs: u32,
        timestamp_micros: u32,
    ) -> Result<Self, ParserBmpError> {
        if peer_flags.contains(PeerFlags::ADDRESS_FAMILY_IPV6) != peer_ip.is_ipv6() {
            return Err(ParserBmpError::AddressFamilyMismatch);
        }
        Ok(BmpPerPeerHeader {
            peer_type,
            peer_flags,
            peer_distinguisher,
            peer_ip,
            peer_asn,
            peer_bgp_id,
            timestamp_secs,
            timestamp_micros,
        })
    }

    #[inline]
    pub fn is_ipv6(&self) -> bool {
        self.peer_flags.contains(PeerFlags::ADDRESS_FAMILY_IPV6)
    }

    #[inline]
    pub fn is_post_policy(&self) -> bool {
        self.peer_flags.contains(PeerFlags::POST_POLICY)
    }

    /// Timestamp as fractional seconds since the Unix epoch.
    pub fn timestamp(&self) -> f64 {
        self.timestamp_secs as f64 + (self.timestamp_micros as f64) / 1_000_000.0
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(BMP_PER_PEER_HEADER_LEN);
        buf.put_u8(self.peer_type.into());
        buf.put_u8(self.peer_flags.bits());
        buf.put_u64(self.peer_distinguisher);
        put_padded_address(&mut buf, &self.peer_ip);
        buf.put_u32(self.peer_asn);
        buf.put_slice(&self.peer_bgp_id.octets());
        buf.put_u32(self.timestamp_secs);
        buf.put_u32(self.timestamp_micros);
        buf.freeze()
    }
}

/// Write an address into a 16-byte field, IPv4 right-aligned behind 12 zero bytes.
pub(crate) fn put_padded_address(buf: &mut BytesMut, addr: &IpAddr) {
    match addr {
        IpAddr::V4(ip) => {
            buf.put_bytes(0, 12);
            buf.put_slice(&ip.octets());
        }
        IpAddr::V6(ip) => buf.put_slice(&ip.octets()),
    }
}

pub fn parse_per_peer_header(data: &mut Bytes) -> Result<BmpPerPeerHeader, ParserBmpError> {
    data.has_n_remaining(BMP_PER_PEER_HEADER_LEN)?;

    let peer_type = PeerType::try_from(data.read_u8()?)?;
    let peer_flags = PeerFlags::from_bits_retain(data.read_u8()?);
    let peer_distinguisher = data.read_u64()?;

    let peer_ip = data
        .read_padded_address(peer_flags.contains(PeerFlags::ADDRESS_FAMILY_IPV6))?
        .ok_or(ParserBmpError::AddressFamilyMismatch)?;

    let peer_asn = data.read_u32()?;
    let peer_bgp_id = data.read_ipv4_address()?;

    let timestamp_secs = data.read_u32()?;
    let timestamp_micros = data.read_u32()?;

    Ok(BmpPerPeerHeader {
        peer_type,
        peer_flags,
        peer_distinguisher,
        peer_ip,
        peer_asn,
        peer_bgp_id,
        timestamp_secs,
        timestamp_micros,
    })
}
