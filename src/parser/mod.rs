/*!
Wire decoders. Every parser here is a pure function over [bytes::Bytes]: no I/O, no
retries, and a structured error on malformed or short input.
*/
pub mod bgp;
pub mod bmp;
pub mod netflow;
pub mod sflow;
pub(crate) mod utils;

pub(crate) use self::utils::*;

pub use crate::error::ParserError;
pub use bgp::parse_bgp_pdu;
pub use bmp::error::ParserBmpError;
pub use bmp::{parse_bmp_packet, BmpPacket};
pub use netflow::error::ParserNetflowError;
pub use netflow::{parse_netflow_packet, TemplateCache};
pub use sflow::error::ParserSflowError;
pub use sflow::{parse_sflow_packet, SflowMode};
