/*!
error module defines the error types shared by all wire decoders in bgpkit-collector.
*/
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    /// This error represents a [num_enum::TryFromPrimitiveError] error for any of the closed
    /// protocol enums (BMP version, peer type, peer down reason, NetFlow field type, ...).
    ///
    /// ## Occurs during:
    ///  - Parsing of any enumerated protocol code
    #[error("unrecognized value {value} for {type_name}")]
    UnrecognizedEnumVariant { type_name: &'static str, value: u64 },
    /// Fewer bytes remain in the input than the next field needs.
    ///
    /// ## Occurs during:
    ///  - Any fixed-width read on a buffer that ends too early
    #[error("not enough bytes: need {needed}, {remaining} remaining")]
    NotEnoughBytes { needed: usize, remaining: usize },
    /// A message body, TLV or record claims more bytes than its enclosing container holds.
    #[error("truncated message: {0}")]
    TruncatedMsg(String),
    /// A field holds a value the protocol does not allow (bad marker, impossible length, ...).
    #[error("invalid field: {0}")]
    InvalidField(String),
}

impl ParserError {
    /// Returns true if more input bytes could turn this failure into a successful parse.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ParserError::NotEnoughBytes { .. })
    }
}

impl<T> From<TryFromPrimitiveError<T>> for ParserError
where
    T: TryFromPrimitive,
    T::Primitive: Into<u64>,
{
    #[inline]
    fn from(value: TryFromPrimitiveError<T>) -> Self {
        ParserError::UnrecognizedEnumVariant {
            type_name: T::NAME,
            value: value.number.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PeerType;

    #[test]
    fn test_enum_error_conversion() {
        let err: ParserError = PeerType::try_from(5u8).unwrap_err().into();
        match err {
            ParserError::UnrecognizedEnumVariant { type_name, value } => {
                assert_eq!(type_name, "PeerType");
                assert_eq!(value, 5);
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn test_insufficient_data() {
        let err = ParserError::NotEnoughBytes {
            needed: 4,
            remaining: 1,
        };
        assert!(err.is_insufficient_data());
        assert_eq!(err.to_string(), "not enough bytes: need 4, 1 remaining");
        assert!(!ParserError::TruncatedMsg("x".to_string()).is_insufficient_data());
    }
}
