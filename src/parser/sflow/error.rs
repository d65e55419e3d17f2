use crate::error::ParserError;
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserSflowError {
    #[error(transparent)]
    ParseError(#[from] ParserError),
    #[error("unsupported sFlow version {0}")]
    UnsupportedVersion(u32),
    #[error("{remaining} bytes after the last complete sample")]
    TrailingBytes { remaining: usize },
    #[error("header announces {declared} samples, datagram holds {decoded}")]
    SampleCountMismatch { declared: u32, decoded: usize },
}

impl ParserSflowError {
    pub fn is_insufficient_data(&self) -> bool {
        match self {
            ParserSflowError::ParseError(e) => e.is_insufficient_data(),
            _ => false,
        }
    }

    /// Samples and records are decoded from slices bounded by their declared lengths, so
    /// running out of bytes there means the declared length was too small.
    pub(crate) fn sample_overrun(self) -> Self {
        match self {
            ParserSflowError::ParseError(ParserError::NotEnoughBytes { needed, remaining }) => {
                ParserSflowError::ParseError(ParserError::TruncatedMsg(format!(
                    "sFlow sample needs {} more bytes, {} left",
                    needed, remaining
                )))
            }
            e => e,
        }
    }
}

impl<T> From<TryFromPrimitiveError<T>> for ParserSflowError
where
    T: TryFromPrimitive,
    ParserError: From<TryFromPrimitiveError<T>>,
{
    fn from(value: TryFromPrimitiveError<T>) -> Self {
        ParserSflowError::ParseError(ParserError::from(value))
    }
}
