/*!
The hand-off point between the collector and application code.
*/
use crate::models::{NetflowPacket, SflowPacket};
use crate::parser::BmpPacket;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

/// Protocol a packet arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transport {
    Bmp,
    Sflow,
    Netflow,
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Bmp => write!(f, "BMP"),
            Transport::Sflow => write!(f, "sFlow"),
            Transport::Netflow => write!(f, "NetFlow"),
        }
    }
}

/// Where a packet came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketContext {
    /// Router (BMP) or exporter (sFlow/NetFlow) socket address.
    pub peer: SocketAddr,
    pub transport: Transport,
}

/// One fully decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollectedPacket {
    Bmp(BmpPacket),
    Sflow(SflowPacket),
    Netflow(NetflowPacket),
}

impl CollectedPacket {
    pub fn transport(&self) -> Transport {
        match self {
            CollectedPacket::Bmp(_) => Transport::Bmp,
            CollectedPacket::Sflow(_) => Transport::Sflow,
            CollectedPacket::Netflow(_) => Transport::Netflow,
        }
    }
}

pub type ListenerError = Box<dyn Error + Send + Sync>;

/// Application logic that consumes decoded packets.
///
/// `process_packet` runs on the task that decoded the packet, so BMP packets of one
/// connection arrive in wire order. It must not block for long: a slow listener stalls the
/// connection (or UDP receive task) that called it. Errors and panics are logged by the
/// [Controller](crate::Controller) and never reach the transport.
pub trait PacketListener: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str;

    fn process_packet(
        &self,
        context: &PacketContext,
        packet: &CollectedPacket,
    ) -> Result<(), ListenerError>;
}
