use crate::models::*;
use crate::parser::bmp::error::ParserBmpError;
use crate::parser::bmp::messages::BmpPerPeerHeader;
use crate::parser::ReadUtils;
use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsReport {
    pub per_peer_header: BmpPerPeerHeader,
    pub counters: Vec<StatCounter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatCounter {
    /// Raw stat type; see [StatCounter::known_type].
    pub stat_type: u16,
    pub stat_data: StatsData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatsData {
    Counter(u32),
    Gauge(u64),
    AfiSafiGauge { afi: u16, safi: u8, value: u64 },
    /// Value of a stat type this collector does not know, kept as received.
    Unknown(Bytes),
}

impl StatCounter {
    pub fn known_type(&self) -> Option<StatType> {
        StatType::try_from(self.stat_type).ok()
    }
}

impl StatsData {
    fn wire_len(&self) -> usize {
        match self {
            StatsData::Counter(_) => 4,
            StatsData::Gauge(_) => 8,
            StatsData::AfiSafiGauge { .. } => 11,
            StatsData::Unknown(b) => b.len(),
        }
    }
}

impl StatsReport {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put(self.per_peer_header.encode());
        buf.put_u32(self.counters.len() as u32);
        for counter in &self.counters {
            buf.put_u16(counter.stat_type);
            buf.put_u16(counter.stat_data.wire_len() as u16);
            match &counter.stat_data {
                StatsData::Counter(v) => buf.put_u32(*v),
                StatsData::Gauge(v) => buf.put_u64(*v),
                StatsData::AfiSafiGauge { afi, safi, value } => {
                    buf.put_u16(*afi);
                    buf.put_u8(*safi);
                    buf.put_u64(*value);
                }
                StatsData::Unknown(b) => buf.put_slice(b),
            }
        }
        buf.freeze()
    }
}

/// Parse BMP statistics report
///
/// <https://www.rfc-editor.org/rfc/rfc7854#section-4.8>
pub fn parse_stats_report(
    data: &mut Bytes,
    per_peer_header: BmpPerPeerHeader,
) -> Result<StatsReport, ParserBmpError> {
    let stats_count = data.read_u32()?;
    let mut counters = vec![];
    for _ in 0..stats_count {
        let stat_type = data.read_u16()?;
        let stat_len = data.read_u16()?;
        let mut value = data.read_bounded(stat_len as usize, "stat counter")?;
        let stat_data = match StatType::try_from(stat_type) {
            Err(_) => StatsData::Unknown(value),
            Ok(_) => match stat_len {
                4 => StatsData::Counter(value.read_u32()?),
                8 => StatsData::Gauge(value.read_u64()?),
                11 => StatsData::AfiSafiGauge {
                    afi: value.read_u16()?,
                    safi: value.read_u8()?,
                    value: value.read_u64()?,
                },
                _ => return Err(ParserBmpError::InvalidStatsDataLength(stat_len)),
            },
        };
        counters.push(StatCounter {
            stat_type,
            stat_data,
        })
    }

    Ok(StatsReport {
        per_peer_header,
        counters,
    })
}
