//! MAPI property stream decoding.
//!
//! ```text
//! count: u32
//! repeated `count` times:
//!   type: u16            (0x1000 = multi-valued flag)
//!   id:   u16
//!   [id in 0x8000..=0xFFFE]  guid: [u8; 16], kind: u32,
//!                            kind == 0 ? lid: u32 : len: u32, name[len], pad
//!   [multi-valued]           value_count: u32
//!   values: [len: u32 if variable] bytes[len] pad-to-4
//! ```
//!
//! Decoding never fails: it stops at the first bounds violation and returns
//! the properties read up to that point.

use tracing::debug;

use super::reader::ByteReader;
use crate::model::property::{
    Property, PropertyName, MV_FLAG, NAMED_PROPERTY_RANGE, PT_BINARY, PT_OBJECT, PT_STRING8,
    PT_UNICODE,
};

/// Upper bound on the values of one multi-valued property.
pub const MAX_VALUES: u32 = 4096;

/// Minimum encoded size of a property; used to clamp the declared count.
const MIN_PROPERTY_SIZE: usize = 8;

/// Length of the GUID that opens a named-property extension.
const GUID_LEN: usize = 16;

/// Decode a property stream into properties in stream order.
pub fn decode_properties(data: &[u8]) -> Vec<Property> {
    let mut reader = ByteReader::new(data);
    let Some(declared) = reader.read_u32() else {
        return Vec::new();
    };

    let count = (declared as usize).min(data.len() / MIN_PROPERTY_SIZE);
    let mut properties = Vec::with_capacity(count);

    for index in 0..count {
        match read_property(&mut reader) {
            Some(property) => properties.push(property),
            None => {
                debug!(
                    index,
                    declared,
                    offset = reader.position(),
                    "Property stream ended early"
                );
                break;
            }
        }
    }

    properties
}

/// Fixed byte width of a base property type, or `None` for variable-length
/// types that carry a length prefix per value.
pub fn value_width(prop_type: u16) -> Option<usize> {
    match prop_type {
        0x0002 | 0x0003 | 0x0004 | 0x000A | 0x000B => Some(4),
        0x0005 | 0x0006 | 0x0007 | 0x0014 | 0x0040 => Some(8),
        0x0048 => Some(16),
        PT_STRING8 | PT_UNICODE | PT_OBJECT | PT_BINARY => None,
        _ => Some(4),
    }
}

fn read_property(reader: &mut ByteReader<'_>) -> Option<Property> {
    let raw_type = reader.read_u16()?;
    let id = reader.read_u16()?;

    let declared_multi = raw_type & MV_FLAG != 0;
    let prop_type = raw_type & !MV_FLAG;
    let width = value_width(prop_type);
    // Variable-length values always carry a value count.
    let has_count = declared_multi || width.is_none();

    let name = if NAMED_PROPERTY_RANGE.contains(&id) {
        Some(read_name(reader)?)
    } else {
        None
    };

    let value_count = if has_count { reader.read_u32()? } else { 1 };
    if value_count > MAX_VALUES {
        debug!(id, value_count, "Multi-value count out of range");
        return None;
    }

    let mut data = Vec::new();
    for _ in 0..value_count {
        let len = match width {
            Some(w) => w,
            None => reader.read_u32()? as usize,
        };
        data.extend_from_slice(reader.take(len)?);
        reader.skip_padding(len);
    }

    Some(Property {
        prop_type,
        multi_valued: declared_multi,
        id,
        name,
        data,
    })
}

/// Read the named-property extension header. The GUID is not retained.
fn read_name(reader: &mut ByteReader<'_>) -> Option<PropertyName> {
    reader.skip(GUID_LEN)?;
    let kind = reader.read_u32()?;
    if kind == 0 {
        return reader.read_u32().map(PropertyName::Id);
    }
    let len = reader.read_u32()? as usize;
    let name = reader.take(len)?.to_vec();
    reader.skip_padding(len);
    Some(PropertyName::String(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property::{PR_BODY, PR_SUBJECT, PT_BOOLEAN, PT_LONG, PT_SYSTIME};

    /// Minimal property stream builder for tests.
    struct Stream(Vec<u8>);

    impl Stream {
        fn new(count: u32) -> Self {
            Self(count.to_le_bytes().to_vec())
        }
        fn u16(mut self, v: u16) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn u32(mut self, v: u32) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn bytes(mut self, b: &[u8]) -> Self {
            self.0.extend_from_slice(b);
            self
        }
        fn padded(self, b: &[u8]) -> Self {
            let pad = vec![0u8; (4 - b.len() % 4) % 4];
            self.u32(b.len() as u32).bytes(b).bytes(&pad)
        }
    }

    #[test]
    fn test_fixed_and_string_properties() {
        let data = Stream::new(3)
            .u16(PT_LONG)
            .u16(0x0E07)
            .u32(42)
            .u16(PT_STRING8)
            .u16(PR_SUBJECT)
            .u32(1)
            .padded(b"Hello\0")
            .u16(PT_SYSTIME)
            .u16(0x0E06)
            .bytes(&[1, 2, 3, 4, 5, 6, 7, 8])
            .0;

        let props = decode_properties(&data);
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].as_u32(), Some(42));
        assert_eq!(props[1].id, PR_SUBJECT);
        assert_eq!(props[1].data, b"Hello\0");
        assert!(!props[1].multi_valued);
        assert_eq!(props[2].data, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_multi_valued_concatenates_without_padding() {
        let data = Stream::new(1)
            .u16(PT_STRING8 | MV_FLAG)
            .u16(0x3A4F)
            .u32(2)
            .padded(b"abc")
            .padded(b"defgh")
            .0;

        let props = decode_properties(&data);
        assert_eq!(props.len(), 1);
        assert!(props[0].multi_valued);
        assert_eq!(props[0].prop_type, PT_STRING8);
        assert_eq!(props[0].data, b"abcdefgh");
    }

    #[test]
    fn test_multi_valued_fixed_width() {
        let data = Stream::new(1)
            .u16(PT_LONG | MV_FLAG)
            .u16(0x1234)
            .u32(2)
            .u32(7)
            .u32(9)
            .0;
        let props = decode_properties(&data);
        assert_eq!(props[0].data, [7, 0, 0, 0, 9, 0, 0, 0]);
    }

    #[test]
    fn test_named_property_with_numeric_id() {
        let data = Stream::new(2)
            .u16(PT_LONG)
            .u16(0x8005)
            .bytes(&[0xAA; 16])
            .u32(0)
            .u32(0x8233)
            .u32(99)
            .u16(PT_LONG)
            .u16(0x0E07)
            .u32(1)
            .0;
        let props = decode_properties(&data);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, Some(PropertyName::Id(0x8233)));
        assert_eq!(props[0].as_u32(), Some(99));
        assert_eq!(props[1].as_u32(), Some(1));
    }

    #[test]
    fn test_named_property_with_string_name() {
        let name = b"K\0e\0y\0s\0\0\0";
        let data = Stream::new(1)
            .u16(PT_BOOLEAN)
            .u16(0x8010)
            .bytes(&[0; 16])
            .u32(1)
            .padded(name)
            .u32(1)
            .0;
        let props = decode_properties(&data);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, Some(PropertyName::String(name.to_vec())));
        assert_eq!(props[0].as_bool(), Some(true));
    }

    #[test]
    fn test_truncated_value_returns_prefix() {
        let data = Stream::new(2)
            .u16(PT_LONG)
            .u16(0x0E07)
            .u32(5)
            .u16(PT_BINARY)
            .u16(PR_BODY)
            .u32(1)
            .u32(1000)
            .bytes(b"short")
            .0;
        let props = decode_properties(&data);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].as_u32(), Some(5));
    }

    #[test]
    fn test_value_count_over_limit_stops() {
        let data = Stream::new(2)
            .u16(PT_LONG | MV_FLAG)
            .u16(0x1234)
            .u32(MAX_VALUES + 1)
            .bytes(&[0; 64])
            .0;
        assert!(decode_properties(&data).is_empty());
    }

    #[test]
    fn test_huge_declared_count_is_clamped() {
        let data = Stream::new(u32::MAX).u16(PT_LONG).u16(0x0E07).u32(3).0;
        let props = decode_properties(&data);
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_hostile_inputs_never_panic() {
        assert!(decode_properties(&[]).is_empty());
        assert!(decode_properties(&[1, 0]).is_empty());
        // Every prefix of a valid stream decodes without panicking.
        let data = Stream::new(2)
            .u16(PT_STRING8)
            .u16(PR_SUBJECT)
            .u32(1)
            .padded(b"subject line")
            .u16(PT_BINARY)
            .u16(0x8001)
            .bytes(&[0; 16])
            .u32(1)
            .padded(b"n\0")
            .u32(1)
            .padded(&[9; 7])
            .0;
        for end in 0..=data.len() {
            let _ = decode_properties(&data[..end]);
        }
        // Pseudo-random garbage.
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..200 {
            let garbage: Vec<u8> = (0..64)
                .map(|_| {
                    seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                    (seed >> 16) as u8
                })
                .collect();
            let _ = decode_properties(&garbage);
        }
    }

    #[test]
    fn test_value_width_table() {
        assert_eq!(value_width(0x0002), Some(4));
        assert_eq!(value_width(0x0040), Some(8));
        assert_eq!(value_width(0x0048), Some(16));
        assert_eq!(value_width(PT_BINARY), None);
        assert_eq!(value_width(0x0999), Some(4));
    }
}
