/*!
Splits a BMP byte stream into complete messages.

Every BMP message starts with a six byte common header whose length field covers the whole
message, so a frame is complete once that many bytes are buffered. A frame that fails to
decode is dropped on its own; the next frame starts right after it. A header that cannot
start any message (wrong version, unknown message type, length below the header size, or
above the configured maximum) gives no usable length, so the decoder skips one byte at a time
until a plausible header lines up again.

While resynchronizing, a plausible header may be a coincidence inside garbage. Such a frame is
only consumed once it decodes; otherwise the scan moves on by a single byte, so valid messages
covered by a bogus length are not lost.
*/
use crate::models::{BmpMsgType, BmpVersion};
use crate::parser::bmp::messages::BMP_COMMON_HEADER_LEN;
use crate::parser::{parse_bmp_packet, BmpPacket};
use bytes::{Buf, Bytes, BytesMut};
use log::{debug, warn};
use std::io;
use std::net::SocketAddr;
use tokio_util::codec::Decoder;

/// Counters kept by one [BmpFrameDecoder].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_decoded: u64,
    /// Complete frames whose content failed to decode.
    pub frames_dropped: u64,
    /// Bytes skipped while looking for a plausible header.
    pub bytes_skipped: u64,
}

#[derive(Debug)]
pub struct BmpFrameDecoder {
    peer: SocketAddr,
    max_message_len: usize,
    resyncing: bool,
    stats: FrameStats,
}

impl BmpFrameDecoder {
    pub fn new(peer: SocketAddr, max_message_len: usize) -> Self {
        BmpFrameDecoder {
            peer,
            max_message_len,
            resyncing: false,
            stats: FrameStats::default(),
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Declared message length if `header` can start a BMP message.
    fn plausible_len(&self, header: &[u8]) -> Option<usize> {
        if header[0] != u8::from(BmpVersion::Bmp3) || BmpMsgType::try_from(header[5]).is_err() {
            return None;
        }
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if len < BMP_COMMON_HEADER_LEN || len > self.max_message_len {
            return None;
        }
        Some(len)
    }
}

impl Decoder for BmpFrameDecoder {
    type Item = BmpPacket;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BmpPacket>, io::Error> {
        loop {
            if src.len() < BMP_COMMON_HEADER_LEN {
                return Ok(None);
            }

            let msg_len = match self.plausible_len(&src[..BMP_COMMON_HEADER_LEN]) {
                Some(len) => len,
                None => {
                    if !self.resyncing {
                        warn!(
                            "{}: invalid BMP header {:02x?}, resynchronizing",
                            self.peer,
                            &src[..BMP_COMMON_HEADER_LEN]
                        );
                        self.resyncing = true;
                    }
                    src.advance(1);
                    self.stats.bytes_skipped += 1;
                    continue;
                }
            };

            if src.len() < msg_len {
                src.reserve(msg_len - src.len());
                return Ok(None);
            }

            if self.resyncing {
                match parse_bmp_packet(&mut Bytes::copy_from_slice(&src[..msg_len])) {
                    Ok(packet) => {
                        src.advance(msg_len);
                        debug!(
                            "{}: BMP stream back in sync after {} skipped bytes",
                            self.peer, self.stats.bytes_skipped
                        );
                        self.resyncing = false;
                        self.stats.frames_decoded += 1;
                        return Ok(Some(packet));
                    }
                    Err(_) => {
                        src.advance(1);
                        self.stats.bytes_skipped += 1;
                        continue;
                    }
                }
            }

            let mut frame = src.split_to(msg_len).freeze();
            match parse_bmp_packet(&mut frame) {
                Ok(packet) => {
                    self.stats.frames_decoded += 1;
                    return Ok(Some(packet));
                }
                Err(e) => {
                    self.stats.frames_dropped += 1;
                    warn!(
                        "{}: dropping malformed BMP message of {} bytes: {}",
                        self.peer, msg_len, e
                    );
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<BmpPacket>, io::Error> {
        match self.decode(buf)? {
            Some(packet) => Ok(Some(packet)),
            None => {
                if !buf.is_empty() {
                    debug!(
                        "{}: discarding {} bytes of an incomplete BMP message at end of stream",
                        self.peer,
                        buf.len()
                    );
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}
