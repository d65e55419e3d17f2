/*!
Provides IO utility functions for read bytes of different length and converting to corresponding structs.

Every read checks the remaining length first, so a short buffer always produces
[ParserError::NotEnoughBytes] instead of a panic inside [bytes::Buf].
*/
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, Bytes};

use crate::error::ParserError;

impl ReadUtils for Bytes {}

pub trait ReadUtils: Buf {
    #[inline]
    fn has_n_remaining(&self, n: usize) -> Result<(), ParserError> {
        if self.remaining() < n {
            Err(ParserError::NotEnoughBytes {
                needed: n,
                remaining: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn read_u8(&mut self) -> Result<u8, ParserError> {
        self.has_n_remaining(1)?;
        Ok(self.get_u8())
    }

    #[inline]
    fn read_u16(&mut self) -> Result<u16, ParserError> {
        self.has_n_remaining(2)?;
        Ok(self.get_u16())
    }

    #[inline]
    fn read_u32(&mut self) -> Result<u32, ParserError> {
        self.has_n_remaining(4)?;
        Ok(self.get_u32())
    }

    #[inline]
    fn read_u64(&mut self) -> Result<u64, ParserError> {
        self.has_n_remaining(8)?;
        Ok(self.get_u64())
    }

    /// Read an unsigned big-endian integer of 1 to 8 bytes.
    fn read_uint(&mut self, n_bytes: usize) -> Result<u64, ParserError> {
        if n_bytes == 0 || n_bytes > 8 {
            return Err(ParserError::InvalidField(format!(
                "cannot read {} bytes as an unsigned integer",
                n_bytes
            )));
        }
        self.has_n_remaining(n_bytes)?;
        Ok(self.get_uint(n_bytes))
    }

    fn read_ipv4_address(&mut self) -> Result<Ipv4Addr, ParserError> {
        let addr = self.read_u32()?;
        Ok(Ipv4Addr::from(addr))
    }

    fn read_ipv6_address(&mut self) -> Result<Ipv6Addr, ParserError> {
        self.has_n_remaining(16)?;
        let buf = self.get_u128();
        Ok(Ipv6Addr::from(buf))
    }

    /// Read a 16-byte address field that holds an IPv4 address in its last four bytes
    /// unless `is_ipv6` is set.
    ///
    /// Returns `Ok(None)` when an IPv4 field has non-zero padding, which means the stored
    /// address does not fit the announced family.
    fn read_padded_address(&mut self, is_ipv6: bool) -> Result<Option<IpAddr>, ParserError> {
        let raw = self.read_ipv6_address()?;
        if is_ipv6 {
            return Ok(Some(IpAddr::V6(raw)));
        }
        let octets = raw.octets();
        if octets[..12].iter().any(|b| *b != 0) {
            return Ok(None);
        }
        Ok(Some(IpAddr::V4(Ipv4Addr::new(
            octets[12], octets[13], octets[14], octets[15],
        ))))
    }

    fn read_mac_address(&mut self) -> Result<[u8; 6], ParserError> {
        self.has_n_remaining(6)?;
        let mut mac = [0u8; 6];
        self.copy_to_slice(&mut mac);
        Ok(mac)
    }

    /// Split off the next `n_bytes` as their own buffer. For [Bytes] this does not copy.
    fn read_n_bytes(&mut self, n_bytes: usize) -> Result<Bytes, ParserError> {
        self.has_n_remaining(n_bytes)?;
        Ok(self.copy_to_bytes(n_bytes))
    }

    fn read_n_bytes_to_string(&mut self, n_bytes: usize) -> Result<String, ParserError> {
        let buffer = self.read_n_bytes(n_bytes)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Take a sub-buffer that a nested structure declared as its own length.
    ///
    /// Unlike [ReadUtils::read_n_bytes], running short here means the container lied about
    /// its content, so the error is [ParserError::TruncatedMsg].
    fn read_bounded(&mut self, n_bytes: usize, what: &str) -> Result<Bytes, ParserError> {
        if self.remaining() < n_bytes {
            return Err(ParserError::TruncatedMsg(format!(
                "{} declares {} bytes, only {} left",
                what,
                n_bytes,
                self.remaining()
            )));
        }
        Ok(self.copy_to_bytes(n_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fixed_width() {
        let mut data = Bytes::from_static(&[0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0xff]);
        assert_eq!(data.read_u8().unwrap(), 1);
        assert_eq!(data.read_u16().unwrap(), 2);
        assert_eq!(data.read_u32().unwrap(), 3);
        assert!(matches!(
            data.read_u16(),
            Err(ParserError::NotEnoughBytes {
                needed: 2,
                remaining: 1
            })
        ));
    }

    #[test]
    fn test_read_uint() {
        let mut data = Bytes::from_static(&[0x00, 0x01, 0x00]);
        assert_eq!(data.read_uint(3).unwrap(), 256);
        assert!(data.read_uint(9).is_err());
    }

    #[test]
    fn test_read_padded_address() {
        let mut v4 = vec![0u8; 12];
        v4.extend_from_slice(&[10, 0, 0, 1]);
        let mut data = Bytes::from(v4.clone());
        assert_eq!(
            data.read_padded_address(false).unwrap(),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );

        let mut data = Bytes::from(v4);
        assert!(matches!(
            data.read_padded_address(true).unwrap(),
            Some(IpAddr::V6(_))
        ));

        let mut dirty = vec![0x20u8; 12];
        dirty.extend_from_slice(&[10, 0, 0, 1]);
        let mut data = Bytes::from(dirty);
        assert_eq!(data.read_padded_address(false).unwrap(), None);
    }

    #[test]
    fn test_read_bounded() {
        let mut data = Bytes::from_static(b"abc");
        assert_eq!(data.read_bounded(2, "tlv").unwrap(), Bytes::from_static(b"ab"));
        assert!(matches!(
            data.read_bounded(2, "tlv"),
            Err(ParserError::TruncatedMsg(_))
        ));
    }
}
