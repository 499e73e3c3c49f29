//! Low-level structural dump of a TNEF stream.
//!
//! Unlike [`crate::decode`], nothing here builds a message model: every
//! record is reported as it appears in the stream, together with the
//! properties of any property-list record.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::Result;
use crate::model::property::{
    clean_string, property_name, type_name, Property, PT_BOOLEAN, PT_LONG, PT_STRING8,
    PT_SYSTIME, PT_UNICODE,
};
use crate::parser::envelope::{
    attribute_name, records, ATT_ATTACHMENT, ATT_ATTACH_DATA, ATT_ATTACH_REND_DATA,
    ATT_ATTACH_TITLE, ATT_MAPI_PROPS, LVL_ATTACHMENT,
};
use crate::parser::mapi::decode_properties;
use crate::parser::reader::le_u32;

/// Longest string value shown in a preview.
const PREVIEW_LIMIT: usize = 200;

/// Result of walking a stream.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    /// Total input size in bytes.
    pub size: usize,
    pub records: Vec<RecordDump>,
    /// Offset of a record that ran past the end of the input.
    pub truncated_at: Option<usize>,
}

/// One envelope record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordDump {
    pub offset: usize,
    /// `"MSG"` or `"ATT"`.
    pub level: &'static str,
    pub id: u16,
    pub name: &'static str,
    pub attr_type: u16,
    pub size: usize,
    pub checksum_ok: bool,
    /// 1-based attachment number, set on rendering-data records.
    pub attachment: Option<usize>,
    /// Attachment title, set on title records.
    pub title: Option<String>,
    /// Property count declared by a property-list record.
    pub declared_properties: Option<u32>,
    pub properties: Vec<PropertyDump>,
}

/// One decoded property.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDump {
    pub id: u16,
    pub name: &'static str,
    pub type_name: String,
    pub named: bool,
    pub multi_valued: bool,
    pub size: usize,
    pub preview: Option<String>,
}

impl From<&Property> for PropertyDump {
    fn from(prop: &Property) -> Self {
        Self {
            id: prop.id,
            name: if prop.is_named() {
                ""
            } else {
                property_name(prop.id)
            },
            type_name: type_name(prop.prop_type),
            named: prop.is_named(),
            multi_valued: prop.multi_valued,
            size: prop.data.len(),
            preview: preview(prop),
        }
    }
}

/// Short human-readable rendering of a value, for the scalar and string
/// types worth showing.
fn preview(prop: &Property) -> Option<String> {
    match prop.prop_type {
        PT_STRING8 | PT_UNICODE if prop.data.len() <= PREVIEW_LIMIT => {
            Some(format!("{:?}", clean_string(&prop.data)))
        }
        PT_LONG => prop.as_u32().map(|v| format!("val={v}")),
        PT_BOOLEAN => prop.as_bool().map(|v| format!("val={v}")),
        PT_SYSTIME => prop
            .as_filetime()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        _ => None,
    }
}

/// Walk every record of `data`.
///
/// Fails only when the signature is missing; a truncated stream yields
/// the records before the damage plus [`Inspection::truncated_at`].
pub fn inspect(data: &[u8]) -> Result<Inspection> {
    let mut iter = records(data)?;
    let mut dumps = Vec::new();
    let mut attachments = 0usize;

    for record in iter.by_ref() {
        let mut dump = RecordDump {
            offset: record.offset,
            level: if record.level == LVL_ATTACHMENT {
                "ATT"
            } else {
                "MSG"
            },
            id: record.id,
            name: attribute_name(record.id),
            attr_type: record.attr_type,
            size: record.payload.len(),
            checksum_ok: record.checksum_ok(),
            attachment: None,
            title: None,
            declared_properties: None,
            properties: Vec::new(),
        };

        match record.id {
            ATT_ATTACH_REND_DATA => {
                attachments += 1;
                dump.attachment = Some(attachments);
            }
            ATT_ATTACH_TITLE => dump.title = Some(clean_string(record.payload)),
            ATT_MAPI_PROPS | ATT_ATTACHMENT => {
                dump.declared_properties = le_u32(record.payload);
                dump.properties = decode_properties(record.payload)
                    .iter()
                    .map(PropertyDump::from)
                    .collect();
            }
            _ => {}
        }
        dumps.push(dump);
    }

    Ok(Inspection {
        size: data.len(),
        records: dumps,
        truncated_at: iter.truncated_at(),
    })
}

/// Render an inspection as indented text, one line per record.
pub fn render(inspection: &Inspection) -> String {
    let mut out = String::new();
    for rec in &inspection.records {
        let _ = write!(
            out,
            "[{}] attr=0x{:04X} {:<22} type=0x{:04X}  size={}",
            rec.level, rec.id, rec.name, rec.attr_type, rec.size
        );
        if !rec.checksum_ok {
            out.push_str("  [BAD CHECKSUM]");
        }
        out.push('\n');

        if let Some(n) = rec.attachment {
            let _ = writeln!(out, "       >>> Attachment #{n}");
        }
        if let Some(ref title) = rec.title {
            let _ = writeln!(out, "       Title: {title:?}");
        }
        if rec.id == ATT_ATTACH_DATA {
            let _ = writeln!(out, "       AttachData: {} bytes", rec.size);
        }
        if let Some(declared) = rec.declared_properties {
            let _ = writeln!(out, "       MAPI props: {declared}");
            for prop in &rec.properties {
                let name = if prop.named { "(named)" } else { prop.name };
                let _ = write!(
                    out,
                    "         0x{:04X} {:<30} {:<10} {}",
                    prop.id, name, prop.type_name, prop.size
                );
                if let Some(ref p) = prop.preview {
                    let _ = write!(out, "  {p}");
                }
                out.push('\n');
            }
            if (rec.properties.len() as u64) < u64::from(declared) {
                let _ = writeln!(
                    out,
                    "         [PARSE ERROR at prop {}]",
                    rec.properties.len()
                );
            }
        }
    }
    if let Some(offset) = inspection.truncated_at {
        let _ = writeln!(out, "  [TRUNCATED at offset {offset}]");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TnefError;

    fn record(level: u8, id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![level];
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        let sum = payload.iter().fold(0u16, |a, &b| a.wrapping_add(b as u16));
        out.extend_from_slice(&sum.to_le_bytes());
        out
    }

    fn stream(records: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![0x78, 0x9F, 0x3E, 0x22, 0x00, 0x00];
        for r in records {
            out.extend_from_slice(r);
        }
        out
    }

    fn subject_props() -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&1u32.to_le_bytes());
        p.extend_from_slice(&PT_STRING8.to_le_bytes());
        p.extend_from_slice(&0x0037u16.to_le_bytes());
        p.extend_from_slice(&1u32.to_le_bytes());
        p.extend_from_slice(&3u32.to_le_bytes());
        p.extend_from_slice(b"Hi\0\0");
        p
    }

    #[test]
    fn test_rejects_non_tnef() {
        assert!(matches!(inspect(b"PK\x03\x04zz"), Err(TnefError::BadSignature)));
    }

    #[test]
    fn test_lists_records_and_properties() {
        let data = stream(&[
            record(1, ATT_MAPI_PROPS, &subject_props()),
            record(2, ATT_ATTACH_REND_DATA, &[0; 4]),
            record(2, ATT_ATTACH_TITLE, b"a.txt\0"),
            record(2, ATT_ATTACH_DATA, &[1, 2, 3]),
        ]);
        let result = inspect(&data).expect("inspect");
        assert_eq!(result.records.len(), 4);
        assert_eq!(result.truncated_at, None);

        let props = &result.records[0];
        assert_eq!(props.level, "MSG");
        assert_eq!(props.name, "attMAPIProps");
        assert_eq!(props.declared_properties, Some(1));
        assert_eq!(props.properties[0].name, "PR_SUBJECT");
        assert_eq!(props.properties[0].preview.as_deref(), Some("\"Hi\""));

        assert_eq!(result.records[1].attachment, Some(1));
        assert_eq!(result.records[2].title.as_deref(), Some("a.txt"));
        assert!(result.records.iter().all(|r| r.checksum_ok));

        let text = render(&result);
        assert!(text.contains("[MSG] attr=0x9003 attMAPIProps"));
        assert!(text.contains(">>> Attachment #1"));
        assert!(text.contains("Title: \"a.txt\""));
        assert!(text.contains("AttachData: 3 bytes"));
        assert!(text.contains("PR_SUBJECT"));
    }

    #[test]
    fn test_reports_truncation() {
        let mut data = stream(&[record(1, ATT_MAPI_PROPS, &subject_props())]);
        let second = record(1, 0x800C, b"body text");
        data.extend_from_slice(&second[..second.len() - 4]);
        let result = inspect(&data).expect("inspect");
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.truncated_at, Some(6 + 11 + subject_props().len()));
        assert!(render(&result).contains("[TRUNCATED at offset"));
    }

    #[test]
    fn test_reports_short_property_list() {
        let mut props = subject_props();
        props[0] = 3;
        let data = stream(&[record(1, ATT_MAPI_PROPS, &props)]);
        let result = inspect(&data).expect("inspect");
        assert_eq!(result.records[0].properties.len(), 1);
        assert!(render(&result).contains("[PARSE ERROR at prop 1]"));
    }

    #[test]
    fn test_flags_bad_checksum() {
        let mut data = stream(&[record(1, 0x800C, b"abc")]);
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        let result = inspect(&data).expect("inspect");
        assert!(!result.records[0].checksum_ok);
        assert!(render(&result).contains("[BAD CHECKSUM]"));
    }
}
