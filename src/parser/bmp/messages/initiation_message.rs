use crate::models::*;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::{parse_raw_tlvs, put_tlv};
use bytes::{Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InitiationMessage {
    pub tlvs: Vec<InitiationTlv>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InitiationTlv {
    pub info_type: InitiationTlvType,
    pub info: String,
}

impl InitiationMessage {
    /// Value of the first sysName TLV, if any.
    pub fn sys_name(&self) -> Option<&str> {
        self.tlvs
            .iter()
            .find(|t| t.info_type == InitiationTlvType::SysName)
            .map(|t| t.info.as_str())
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for tlv in &self.tlvs {
            put_tlv(&mut buf, tlv.info_type.into(), tlv.info.as_bytes());
        }
        buf.freeze()
    }
}

/// Parse BMP initiation message
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.3>
pub fn parse_initiation_message(data: &mut Bytes) -> Result<InitiationMessage, ParserBmpError> {
    let mut tlvs = vec![];
    for (info_type, value) in parse_raw_tlvs(data, "initiation")? {
        tlvs.push(InitiationTlv {
            info_type: InitiationTlvType::try_from(info_type)?,
            info: String::from_utf8_lossy(&value).into_owned(),
        });
    }
    Ok(InitiationMessage { tlvs })
}
