//! One BMP connection from a monitored router.
use crate::controller::Controller;
use crate::framing::{BmpFrameDecoder, FrameStats};
use crate::listener::{CollectedPacket, PacketContext, Transport};
use crate::parser::bmp::messages::BmpMessage;
use crate::parser::BmpPacket;
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::net::SocketAddr;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not reading yet.
    Connected,
    /// Reading and dispatching messages.
    Active,
    /// Closed by the router, by a transport error or by shutdown.
    Disconnected,
}

/// Why a session stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    PeerClosed,
    TransportError,
    Cancelled,
}

/// Reads BMP messages from one connection and hands each one to the [Controller] in
/// arrival order.
///
/// The session owns its read buffer and decoder; nothing in it is shared with other
/// connections. There is no reconnect: a closed session is finished.
#[derive(Debug)]
pub struct BmpSession {
    peer: SocketAddr,
    state: SessionState,
    router_name: Option<String>,
    packets: u64,
    frame_stats: FrameStats,
}

impl BmpSession {
    pub fn new(peer: SocketAddr) -> Self {
        BmpSession {
            peer,
            state: SessionState::Connected,
            router_name: None,
            packets: 0,
            frame_stats: FrameStats::default(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `sysName` from the router's Initiation message, once seen.
    pub fn router_name(&self) -> Option<&str> {
        self.router_name.as_deref()
    }

    /// Packets dispatched so far.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.frame_stats
    }

    /// Read until the router closes the connection, the transport fails or `cancel` fires.
    pub async fn run<R: AsyncRead + Unpin>(
        &mut self,
        reader: R,
        controller: &Controller,
        cancel: CancellationToken,
    ) -> SessionEnd {
        let config = controller.config();
        let decoder = BmpFrameDecoder::new(self.peer, config.max_bmp_message_len);
        let mut frames = FramedRead::with_capacity(reader, decoder, config.read_buffer_size);
        let context = PacketContext {
            peer: self.peer,
            transport: Transport::Bmp,
        };

        info!("{}: BMP session connected", self.peer);
        self.state = SessionState::Active;

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break SessionEnd::Cancelled,
                next = frames.next() => next,
            };

            let dropped = frames.decoder().stats().frames_dropped - self.frame_stats.frames_dropped;
            if dropped > 0 {
                controller.record_frames_dropped(dropped);
            }
            self.frame_stats = frames.decoder().stats();

            match next {
                Some(Ok(packet)) => {
                    self.on_message(&packet);
                    self.packets += 1;
                    controller.process_packet(&context, &CollectedPacket::Bmp(packet));
                }
                Some(Err(e)) => {
                    warn!("{}: BMP transport error: {}", self.peer, e);
                    break SessionEnd::TransportError;
                }
                None => break SessionEnd::PeerClosed,
            }
        };

        self.state = SessionState::Disconnected;
        info!(
            "{}: BMP session closed ({:?}) after {} messages, {} dropped, {} bytes skipped",
            self.peer,
            end,
            self.packets,
            self.frame_stats.frames_dropped,
            self.frame_stats.bytes_skipped
        );
        end
    }

    fn on_message(&mut self, packet: &BmpPacket) {
        match &packet.message {
            BmpMessage::Initiation(msg) => {
                if let Some(name) = msg.sys_name() {
                    info!("{}: router identifies as {}", self.peer, name);
                    self.router_name = Some(name.to_string());
                }
            }
            BmpMessage::Termination(msg) => {
                info!(
                    "{}: router terminates the session, reason {:?}",
                    self.peer,
                    msg.reason()
                );
            }
            BmpMessage::PeerDownNotification(msg) => {
                debug!(
                    "{}: peer {} down, {:?}",
                    self.peer, msg.per_peer_header.peer_ip, msg.reason
                );
            }
            _ => {}
        }
    }
}
