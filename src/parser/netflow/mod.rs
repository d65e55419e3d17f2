/*!
Provides parsing for NetFlow version 9 export packets.

Data flowsets can only be decoded with the template that describes them, so decoding
takes a [TemplateCache] that outlives single packets. Templates found in a packet are
registered before any data flowset of the same packet is decoded, which lets exporters
put a template and its first data records in one datagram regardless of flowset order.

<https://www.rfc-editor.org/rfc/rfc3954>
*/
use crate::models::*;
use crate::parser::ReadUtils;
use bytes::{Buf, Bytes};
use log::{debug, trace, warn};
use std::net::IpAddr;

pub mod error;
mod template_cache;

use error::ParserNetflowError;
pub use template_cache::{TemplateCache, TemplateKey, DEFAULT_MAX_TEMPLATES_PER_EXPORTER};

pub const NETFLOW_HEADER_LEN: usize = 20;
const FLOWSET_HEADER_LEN: usize = 4;
const TEMPLATE_FLOWSET_ID: u16 = 0;
const OPTIONS_TEMPLATE_FLOWSET_ID: u16 = 1;
const MIN_DATA_FLOWSET_ID: u16 = 256;

fn register_template(
    templates: &TemplateCache,
    exporter: IpAddr,
    source_id: u32,
    template: &Template,
) {
    if !templates.insert(exporter, source_id, template.clone()) {
        warn!(
            "NetFlow exporter {} source {}: template limit {} reached, ignoring template {}",
            exporter,
            source_id,
            templates.max_per_exporter(),
            template.template_id
        );
    }
}

enum PendingSet {
    Decoded(FlowSet),
    Data { template_id: u16, body: Bytes },
}

/// Parse one NetFlow v9 packet sent by `exporter`.
pub fn parse_netflow_packet(
    data: &mut Bytes,
    exporter: IpAddr,
    templates: &TemplateCache,
) -> Result<NetflowPacket, ParserNetflowError> {
    let header = parse_netflow_header(data)?;

    let mut pending = vec![];
    while data.has_remaining() {
        let set_id = data.read_u16()?;
        let set_len = data.read_u16()?;
        if (set_len as usize) < FLOWSET_HEADER_LEN {
            return Err(ParserNetflowError::InvalidSetLength(set_len));
        }
        let mut body = data.read_bounded(set_len as usize - FLOWSET_HEADER_LEN, "NetFlow flowset")?;
        match set_id {
            TEMPLATE_FLOWSET_ID => {
                let parsed = parse_templates(&mut body).map_err(ParserNetflowError::set_overrun)?;
                for template in &parsed {
                    trace!(
                        "NetFlow exporter {} source {}: template {}",
                        exporter,
                        header.source_id,
                        template.template_id
                    );
                    register_template(templates, exporter, header.source_id, template);
                }
                pending.push(PendingSet::Decoded(FlowSet::Template(parsed)));
            }
            OPTIONS_TEMPLATE_FLOWSET_ID => {
                let parsed =
                    parse_options_templates(&mut body).map_err(ParserNetflowError::set_overrun)?;
                for template in &parsed {
                    register_template(templates, exporter, header.source_id, template);
                }
                pending.push(PendingSet::Decoded(FlowSet::OptionsTemplate(parsed)));
            }
            id if id >= MIN_DATA_FLOWSET_ID => pending.push(PendingSet::Data {
                template_id: id,
                body,
            }),
            id => {
                debug!(
                    "NetFlow exporter {}: skipping reserved flowset id {}",
                    exporter, id
                );
            }
        }
    }

    let mut flowsets = Vec::with_capacity(pending.len());
    for set in pending {
        let flowset = match set {
            PendingSet::Decoded(flowset) => flowset,
            PendingSet::Data {
                template_id,
                mut body,
            } => {
                let template = templates
                    .get(exporter, header.source_id, template_id)
                    .ok_or(ParserNetflowError::MissingTemplate {
                        exporter,
                        source_id: header.source_id,
                        template_id,
                    })?;
                FlowSet::Data {
                    template_id,
                    records: parse_data_records(&mut body, &template)?,
                }
            }
        };
        flowsets.push(flowset);
    }

    Ok(NetflowPacket { header, flowsets })
}

pub fn parse_netflow_header(data: &mut Bytes) -> Result<NetflowHeader, ParserNetflowError> {
    let version = data.read_u16()?;
    if version != NETFLOW_VERSION_9 {
        return Err(ParserNetflowError::UnsupportedVersion(version));
    }
    data.has_n_remaining(NETFLOW_HEADER_LEN - 2)?;
    Ok(NetflowHeader {
        version,
        count: data.read_u16()?,
        sys_uptime: data.read_u32()?,
        unix_secs: data.read_u32()?,
        sequence_number: data.read_u32()?,
        source_id: data.read_u32()?,
    })
}

fn parse_templates(data: &mut Bytes) -> Result<Vec<Template>, ParserNetflowError> {
    let mut templates = vec![];
    // anything shorter than a template header is padding
    while data.remaining() >= 4 {
        let template_id = data.read_u16()?;
        let field_count = data.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(FlowTemplateField {
                field: FlowField::try_from(data.read_u16()?)?,
                length: data.read_u16()?,
            });
        }
        let template = Template {
            template_id,
            scope_fields: vec![],
            fields,
        };
        validate_template(&template)?;
        templates.push(template);
    }
    Ok(templates)
}

fn parse_options_templates(data: &mut Bytes) -> Result<Vec<Template>, ParserNetflowError> {
    let mut templates = vec![];
    while data.remaining() >= 6 {
        let template_id = data.read_u16()?;
        let scope_len = data.read_u16()? as usize;
        let option_len = data.read_u16()? as usize;

        let mut scope_data = data.read_bounded(scope_len, "NetFlow option scopes")?;
        let mut scope_fields = vec![];
        while scope_data.has_remaining() {
            scope_fields.push(ScopeTemplateField {
                scope: ScopeType::try_from(scope_data.read_u16()?)?,
                length: scope_data.read_u16()?,
            });
        }

        let mut option_data = data.read_bounded(option_len, "NetFlow option fields")?;
        let mut fields = vec![];
        while option_data.has_remaining() {
            fields.push(FlowTemplateField {
                field: FlowField::try_from(option_data.read_u16()?)?,
                length: option_data.read_u16()?,
            });
        }

        let template = Template {
            template_id,
            scope_fields,
            fields,
        };
        validate_template(&template)?;
        templates.push(template);
    }
    Ok(templates)
}

fn validate_template(template: &Template) -> Result<(), ParserNetflowError> {
    let invalid = |reason: &str| ParserNetflowError::InvalidTemplate {
        template_id: template.template_id,
        reason: reason.to_string(),
    };
    if template.template_id < MIN_DATA_FLOWSET_ID {
        return Err(invalid("template ids below 256 are reserved"));
    }
    if template.fields.iter().any(|f| f.length == 0)
        || template.scope_fields.iter().any(|f| f.length == 0)
    {
        return Err(invalid("zero-length field"));
    }
    if template.record_len() == 0 {
        return Err(invalid("no fields"));
    }
    Ok(())
}

fn parse_data_records(
    data: &mut Bytes,
    template: &Template,
) -> Result<Vec<DataRecord>, ParserNetflowError> {
    let record_len = template.record_len();
    let mut records = vec![];
    // trailing bytes shorter than one record are padding
    while data.remaining() >= record_len {
        let mut scopes = Vec::with_capacity(template.scope_fields.len());
        for scope in &template.scope_fields {
            scopes.push((scope.scope, data.read_n_bytes(scope.length as usize)?));
        }
        let mut flows = Vec::with_capacity(template.fields.len());
        for field in &template.fields {
            let mut raw = data.read_n_bytes(field.length as usize)?;
            flows.push(Flow {
                field: field.field,
                value: parse_field_value(field.field.kind(), &mut raw)?,
            });
        }
        records.push(DataRecord { scopes, flows });
    }
    Ok(records)
}

/// Decode one field according to its kind. A length the kind cannot hold keeps the raw bytes.
fn parse_field_value(kind: FieldKind, raw: &mut Bytes) -> Result<FlowValue, ParserNetflowError> {
    let len = raw.len();
    let value = match (kind, len) {
        (FieldKind::Unsigned, 1..=8) => FlowValue::Unsigned(raw.read_uint(len)?),
        (FieldKind::Ipv4, 4) => FlowValue::Ipv4(raw.read_ipv4_address()?),
        (FieldKind::Ipv6, 16) => FlowValue::Ipv6(raw.read_ipv6_address()?),
        (FieldKind::Mac, 6) => FlowValue::Mac(raw.read_mac_address()?),
        (FieldKind::String, _) => {
            let text = raw.read_n_bytes_to_string(len)?;
            FlowValue::String(text.trim_end_matches('\0').to_string())
        }
        _ => FlowValue::Bytes(raw.split_to(len)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;
    use bytes::{BufMut, BytesMut};
    use std::net::Ipv4Addr;

    const EXPORTER: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

    fn header(buf: &mut BytesMut, count: u16, source_id: u32) {
        buf.put_u16(9);
        buf.put_u16(count);
        buf.put_u32(120_000);
        buf.put_u32(1_700_000_000);
        buf.put_u32(1);
        buf.put_u32(source_id);
    }

    fn template_set(buf: &mut BytesMut) {
        // template 256: IPV4_SRC_ADDR(4) IPV4_DST_ADDR(4) IN_BYTES(4) PROTOCOL(1) IF_NAME(8)
        buf.put_u16(0);
        buf.put_u16(4 + 4 + 5 * 4);
        buf.put_u16(256);
        buf.put_u16(5);
        for (field, len) in [(8u16, 4u16), (12, 4), (1, 4), (4, 1), (82, 8)] {
            buf.put_u16(field);
            buf.put_u16(len);
        }
    }

    fn data_set(buf: &mut BytesMut, records: u8) {
        let record_len = 21;
        let padding = (4 - (4 + record_len * records as usize) % 4) % 4;
        buf.put_u16(256);
        buf.put_u16((4 + record_len * records as usize + padding) as u16);
        for i in 0..records {
            buf.put_slice(&[10, 0, 0, i]);
            buf.put_slice(&[10, 0, 1, i]);
            buf.put_u32(1500 * (i as u32 + 1));
            buf.put_u8(6);
            buf.put_slice(b"eth0\0\0\0\0");
        }
        buf.put_bytes(0, padding);
    }

    #[test]
    fn test_template_then_data() {
        let cache = TemplateCache::new();
        let mut buf = BytesMut::new();
        header(&mut buf, 3, 7);
        template_set(&mut buf);
        data_set(&mut buf, 2);

        let packet = parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache).unwrap();
        assert_eq!(packet.header.source_id, 7);
        assert_eq!(packet.flowsets.len(), 2);
        assert_eq!(cache.len(), 1);

        match &packet.flowsets[1] {
            FlowSet::Data {
                template_id,
                records,
            } => {
                assert_eq!(*template_id, 256);
                assert_eq!(records.len(), 2);
                let second = &records[1];
                assert_eq!(
                    second.get(FlowField::Ipv4SrcAddr).and_then(FlowValue::as_ip),
                    Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
                );
                assert_eq!(
                    second.get(FlowField::InBytes).and_then(FlowValue::as_u64),
                    Some(3000)
                );
                assert_eq!(
                    second.get(FlowField::IfName),
                    Some(&FlowValue::String("eth0".to_string()))
                );
            }
            other => panic!("unexpected flowset {:?}", other),
        }
    }

    #[test]
    fn test_data_before_template_in_same_packet() {
        let cache = TemplateCache::new();
        let mut buf = BytesMut::new();
        header(&mut buf, 2, 7);
        data_set(&mut buf, 1);
        template_set(&mut buf);
        let packet = parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache).unwrap();
        assert!(matches!(&packet.flowsets[0], FlowSet::Data { records, .. } if records.len() == 1));
        assert!(matches!(&packet.flowsets[1], FlowSet::Template(_)));
    }

    #[test]
    fn test_missing_template() {
        let cache = TemplateCache::new();
        let mut buf = BytesMut::new();
        header(&mut buf, 1, 7);
        data_set(&mut buf, 1);
        let data = buf.freeze();
        assert!(matches!(
            parse_netflow_packet(&mut data.clone(), EXPORTER, &cache),
            Err(ParserNetflowError::MissingTemplate {
                template_id: 256,
                source_id: 7,
                ..
            })
        ));

        // a template from another observation domain does not apply
        let mut other = BytesMut::new();
        header(&mut other, 1, 8);
        template_set(&mut other);
        parse_netflow_packet(&mut other.freeze(), EXPORTER, &cache).unwrap();
        assert!(parse_netflow_packet(&mut data.clone(), EXPORTER, &cache).is_err());

        // once the template is known the same packet decodes
        let mut template_only = BytesMut::new();
        header(&mut template_only, 1, 7);
        template_set(&mut template_only);
        parse_netflow_packet(&mut template_only.freeze(), EXPORTER, &cache).unwrap();
        assert!(parse_netflow_packet(&mut data.clone(), EXPORTER, &cache).is_ok());
    }

    #[test]
    fn test_template_limit_per_exporter() {
        let cache = TemplateCache::with_limit(1);
        let mut first = BytesMut::new();
        header(&mut first, 1, 7);
        template_set(&mut first);
        parse_netflow_packet(&mut first.freeze(), EXPORTER, &cache).unwrap();

        // same template id in a new observation domain is a new key and is refused
        let mut buf = BytesMut::new();
        header(&mut buf, 2, 8);
        template_set(&mut buf);
        data_set(&mut buf, 1);
        assert!(matches!(
            parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache),
            Err(ParserNetflowError::MissingTemplate { source_id: 8, .. })
        ));
        assert_eq!(cache.len(), 1);

        // the known template still decodes data
        let mut buf = BytesMut::new();
        header(&mut buf, 2, 7);
        template_set(&mut buf);
        data_set(&mut buf, 1);
        let packet = parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache).unwrap();
        assert!(matches!(&packet.flowsets[1], FlowSet::Data { records, .. } if records.len() == 1));
    }

    #[test]
    fn test_options_template() {
        let cache = TemplateCache::new();
        let mut buf = BytesMut::new();
        header(&mut buf, 2, 0);
        // options template 300: scope SYSTEM(4), fields SAMPLING_INTERVAL(4) SAMPLING_ALGORITHM(1)
        buf.put_u16(1);
        buf.put_u16(4 + 6 + 4 + 8 + 2);
        buf.put_u16(300);
        buf.put_u16(4);
        buf.put_u16(8);
        buf.put_u16(1);
        buf.put_u16(4);
        buf.put_u16(34);
        buf.put_u16(4);
        buf.put_u16(35);
        buf.put_u16(1);
        buf.put_u16(0); // padding
        // one options data record
        buf.put_u16(300);
        buf.put_u16(4 + 9 + 3);
        buf.put_u32(0x0a000001);
        buf.put_u32(100);
        buf.put_u8(2);
        buf.put_bytes(0, 3);

        let packet = parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache).unwrap();
        match &packet.flowsets[0] {
            FlowSet::OptionsTemplate(templates) => {
                assert_eq!(templates.len(), 1);
                assert!(templates[0].is_options_template());
                assert_eq!(templates[0].record_len(), 9);
            }
            other => panic!("unexpected flowset {:?}", other),
        }
        match &packet.flowsets[1] {
            FlowSet::Data { records, .. } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].scopes[0].0, ScopeType::System);
                assert_eq!(
                    records[0].get(FlowField::SamplingInterval),
                    Some(&FlowValue::Unsigned(100))
                );
            }
            other => panic!("unexpected flowset {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_code() {
        let cache = TemplateCache::new();
        let mut buf = BytesMut::new();
        header(&mut buf, 1, 0);
        buf.put_u16(0);
        buf.put_u16(12);
        buf.put_u16(256);
        buf.put_u16(1);
        buf.put_u16(43);
        buf.put_u16(4);
        assert!(matches!(
            parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache),
            Err(ParserNetflowError::ParseError(
                ParserError::UnrecognizedEnumVariant {
                    type_name: "FlowField",
                    value: 43
                }
            ))
        ));
    }

    #[test]
    fn test_invalid_packets() {
        let cache = TemplateCache::new();

        let mut v5 = Bytes::from_static(&[0, 5, 0, 0]);
        assert!(matches!(
            parse_netflow_packet(&mut v5, EXPORTER, &cache),
            Err(ParserNetflowError::UnsupportedVersion(5))
        ));

        let mut short = Bytes::from_static(&[0, 9, 0, 1, 0, 0]);
        assert!(parse_netflow_packet(&mut short, EXPORTER, &cache)
            .unwrap_err()
            .is_insufficient_data());

        let mut buf = BytesMut::new();
        header(&mut buf, 1, 0);
        buf.put_u16(256);
        buf.put_u16(2);
        assert!(matches!(
            parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache),
            Err(ParserNetflowError::InvalidSetLength(2))
        ));

        let mut buf = BytesMut::new();
        header(&mut buf, 1, 0);
        buf.put_u16(256);
        buf.put_u16(100);
        buf.put_u32(0);
        assert!(matches!(
            parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache),
            Err(ParserNetflowError::ParseError(ParserError::TruncatedMsg(_)))
        ));

        // template id in the reserved range
        let mut buf = BytesMut::new();
        header(&mut buf, 1, 0);
        buf.put_u16(0);
        buf.put_u16(12);
        buf.put_u16(5);
        buf.put_u16(1);
        buf.put_u16(1);
        buf.put_u16(4);
        assert!(matches!(
            parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache),
            Err(ParserNetflowError::InvalidTemplate { template_id: 5, .. })
        ));
    }

    #[test]
    fn test_reserved_flowset_skipped() {
        let cache = TemplateCache::new();
        let mut buf = BytesMut::new();
        header(&mut buf, 1, 0);
        buf.put_u16(128);
        buf.put_u16(8);
        buf.put_u32(0xdeadbeef);
        let packet = parse_netflow_packet(&mut buf.freeze(), EXPORTER, &cache).unwrap();
        assert!(packet.flowsets.is_empty());
    }
}
