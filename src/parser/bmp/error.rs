use crate::error::ParserError;
use crate::models::BgpMessageType;
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserBmpError {
    #[error(transparent)]
    ParseError(#[from] ParserError),
    #[error("unsupported BMP version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid BMP message length {0}")]
    InvalidMessageLength(u32),
    #[error("BMP message declares {declared} bytes but its content ends after {consumed}")]
    LengthMismatch { declared: u32, consumed: usize },
    #[error("address does not match the address family flag")]
    AddressFamilyMismatch,
    #[error("invalid stats data length {0}")]
    InvalidStatsDataLength(u16),
    #[error("expected BGP {expected:?} message, found {found:?}")]
    UnexpectedBgpMessage {
        expected: BgpMessageType,
        found: BgpMessageType,
    },
}

impl ParserBmpError {
    /// Returns true if the input ended before a complete BMP message was available.
    pub fn is_insufficient_data(&self) -> bool {
        match self {
            ParserBmpError::ParseError(e) => e.is_insufficient_data(),
            _ => false,
        }
    }

    /// Body parsers read from a slice bounded by the common header length, so running out
    /// of bytes there means the body overran its declared length.
    pub(crate) fn body_overrun(self) -> Self {
        match self {
            ParserBmpError::ParseError(ParserError::NotEnoughBytes { needed, remaining }) => {
                ParserBmpError::ParseError(ParserError::TruncatedMsg(format!(
                    "BMP message body needs {} more bytes, {} left",
                    needed, remaining
                )))
            }
            e => e,
        }
    }
}

impl<T> From<TryFromPrimitiveError<T>> for ParserBmpError
where
    T: TryFromPrimitive,
    ParserError: From<TryFromPrimitiveError<T>>,
{
    fn from(value: TryFromPrimitiveError<T>) -> Self {
        ParserBmpError::ParseError(ParserError::from(value))
    }
}
