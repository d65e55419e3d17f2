use crate::error::ParserError;
use crate::models::*;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::{parse_raw_tlvs, put_tlv};
use bytes::{Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminationMessage {
    pub tlvs: Vec<TerminationTlv>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationTlv {
    String(String),
    Reason(TerminationReason),
}

impl TerminationMessage {
    pub fn reason(&self) -> Option<TerminationReason> {
        self.tlvs.iter().find_map(|t| match t {
            TerminationTlv::Reason(r) => Some(*r),
            TerminationTlv::String(_) => None,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for tlv in &self.tlvs {
            match tlv {
                TerminationTlv::String(s) => {
                    put_tlv(&mut buf, TerminationTlvType::String.into(), s.as_bytes())
                }
                TerminationTlv::Reason(r) => {
                    let code: u16 = (*r).into();
                    put_tlv(&mut buf, TerminationTlvType::Reason.into(), &code.to_be_bytes())
                }
            }
        }
        buf.freeze()
    }
}

/// Parse BMP termination message
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.5>
pub fn parse_termination_message(data: &mut Bytes) -> Result<TerminationMessage, ParserBmpError> {
    let mut tlvs = vec![];
    for (info_type, value) in parse_raw_tlvs(data, "termination")? {
        let tlv = match TerminationTlvType::try_from(info_type)? {
            TerminationTlvType::String => {
                TerminationTlv::String(String::from_utf8_lossy(&value).into_owned())
            }
            TerminationTlvType::Reason => {
                if value.len() != 2 {
                    return Err(ParserError::InvalidField(format!(
                        "termination reason must be 2 bytes, got {}",
                        value.len()
                    ))
                    .into());
                }
                let code = u16::from_be_bytes([value[0], value[1]]);
                TerminationTlv::Reason(TerminationReason::try_from(code)?)
            }
        };
        tlvs.push(tlv);
    }

    Ok(TerminationMessage { tlvs })
}
