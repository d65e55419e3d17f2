use crate::error::ParserError;
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserNetflowError {
    #[error(transparent)]
    ParseError(#[from] ParserError),
    #[error("unsupported NetFlow version {0}")]
    UnsupportedVersion(u16),
    #[error("no template {template_id} from exporter {exporter} source id {source_id}")]
    MissingTemplate {
        exporter: IpAddr,
        source_id: u32,
        template_id: u16,
    },
    #[error("invalid flowset length {0}")]
    InvalidSetLength(u16),
    #[error("invalid template {template_id}: {reason}")]
    InvalidTemplate { template_id: u16, reason: String },
}

impl ParserNetflowError {
    pub fn is_insufficient_data(&self) -> bool {
        match self {
            ParserNetflowError::ParseError(e) => e.is_insufficient_data(),
            _ => false,
        }
    }

    /// Flowset contents are decoded from a slice bounded by the flowset length, so running
    /// out of bytes there means the flowset lied about its length.
    pub(crate) fn set_overrun(self) -> Self {
        match self {
            ParserNetflowError::ParseError(ParserError::NotEnoughBytes { needed, remaining }) => {
                ParserNetflowError::ParseError(ParserError::TruncatedMsg(format!(
                    "NetFlow flowset needs {} more bytes, {} left",
                    needed, remaining
                )))
            }
            e => e,
        }
    }
}

impl<T> From<TryFromPrimitiveError<T>> for ParserNetflowError
where
    T: TryFromPrimitive,
    ParserError: From<TryFromPrimitiveError<T>>,
{
    fn from(value: TryFromPrimitiveError<T>) -> Self {
        ParserNetflowError::ParseError(ParserError::from(value))
    }
}
