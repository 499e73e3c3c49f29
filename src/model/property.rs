//! MAPI properties as decoded from a property stream.
//!
//! Values are kept as raw little-endian bytes. For multi-valued properties
//! the bytes of every value are concatenated in stream order with the
//! alignment padding removed; that concatenation is the canonical value.

use chrono::{DateTime, Utc};

// ── Property types ──────────────────────────────────────────────

pub const PT_SHORT: u16 = 0x0002;
pub const PT_LONG: u16 = 0x0003;
pub const PT_FLOAT: u16 = 0x0004;
pub const PT_DOUBLE: u16 = 0x0005;
pub const PT_CURRENCY: u16 = 0x0006;
pub const PT_APPTIME: u16 = 0x0007;
pub const PT_ERROR: u16 = 0x000A;
pub const PT_BOOLEAN: u16 = 0x000B;
pub const PT_OBJECT: u16 = 0x000D;
pub const PT_I8: u16 = 0x0014;
pub const PT_STRING8: u16 = 0x001E;
pub const PT_UNICODE: u16 = 0x001F;
pub const PT_SYSTIME: u16 = 0x0040;
pub const PT_CLSID: u16 = 0x0048;
pub const PT_BINARY: u16 = 0x0102;

/// Flag bit marking a multi-valued property type.
pub const MV_FLAG: u16 = 0x1000;

// ── Property identifiers ────────────────────────────────────────

pub const PR_SUBJECT: u16 = 0x0037;
pub const PR_SENDER_NAME: u16 = 0x0C1A;
pub const PR_SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
pub const PR_DISPLAY_CC: u16 = 0x0E03;
pub const PR_DISPLAY_TO: u16 = 0x0E04;
pub const PR_MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
pub const PR_BODY: u16 = 0x1000;
pub const PR_RTF_COMPRESSED: u16 = 0x1009;
pub const PR_BODY_HTML: u16 = 0x1013;
pub const PR_ATTACH_DATA_OBJ: u16 = 0x3701;
pub const PR_ATTACH_FILENAME: u16 = 0x3704;
pub const PR_ATTACH_METHOD: u16 = 0x3705;
pub const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
pub const PR_ATTACH_MIME_TAG: u16 = 0x370E;
pub const PR_ATTACH_CONTENT_ID: u16 = 0x3712;

/// Identifier range reserved for named properties.
pub const NAMED_PROPERTY_RANGE: std::ops::RangeInclusive<u16> = 0x8000..=0xFFFE;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

/// Name of a named property, as found in the stream extension header.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum PropertyName {
    /// Kind 0: numeric name (LID).
    Id(u32),
    /// Any other kind: raw name bytes, usually UTF-16LE.
    String(Vec<u8>),
}

/// A single decoded MAPI property.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Property {
    /// Base property type, with the multi-value flag masked off.
    pub prop_type: u16,
    /// Whether the stream declared the multi-value flag.
    pub multi_valued: bool,
    /// Property identifier (e.g. `0x0037` for the subject).
    pub id: u16,
    /// Name from the extension header, for ids in the named range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PropertyName>,
    /// Concatenated value bytes.
    #[serde(rename = "size", serialize_with = "super::serialize_len")]
    pub data: Vec<u8>,
}

impl Property {
    /// Value as a string: NUL bytes removed, surrounding whitespace trimmed.
    ///
    /// Invalid UTF-8 sequences are replaced. No charset conversion is
    /// attempted; UTF-16 text in the ASCII range survives NUL stripping.
    pub fn as_string(&self) -> String {
        clean_string(&self.data)
    }

    /// First four bytes as a little-endian `u32`.
    pub fn as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Boolean value (non-zero first word).
    pub fn as_bool(&self) -> Option<bool> {
        self.as_u32().map(|v| v != 0)
    }

    /// `PT_SYSTIME` value converted from a Windows FILETIME.
    pub fn as_filetime(&self) -> Option<DateTime<Utc>> {
        let bytes: [u8; 8] = self.data.get(..8)?.try_into().ok()?;
        let ticks = u64::from_le_bytes(bytes);
        let secs = (ticks / 10_000_000) as i64 - FILETIME_UNIX_OFFSET;
        let nanos = ((ticks % 10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    /// Whether the id falls in the named-property range.
    pub fn is_named(&self) -> bool {
        NAMED_PROPERTY_RANGE.contains(&self.id)
    }
}

/// Strip NUL bytes and surrounding whitespace from raw string bytes.
pub fn clean_string(data: &[u8]) -> String {
    let stripped: Vec<u8> = data.iter().copied().filter(|&b| b != 0).collect();
    String::from_utf8_lossy(&stripped).trim().to_string()
}

/// Symbolic name of a MAPI property id, or `""` when unknown.
pub fn property_name(id: u16) -> &'static str {
    match id {
        0x0002 => "PR_ALTERNATE_RECIPIENT",
        0x001A => "PR_MESSAGE_CLASS",
        0x0037 => "PR_SUBJECT",
        0x003D => "PR_SUBJECT_PREFIX",
        0x0042 => "PR_SENT_REPRESENTING_NAME",
        0x0065 => "PR_SENT_REPRESENTING_EMAIL",
        0x0070 => "PR_CONVERSATION_TOPIC",
        0x0071 => "PR_CONVERSATION_INDEX",
        0x0C1A => "PR_SENDER_NAME",
        0x0C1E => "PR_SENDER_ADDRTYPE",
        0x0C1F => "PR_SENDER_EMAIL_ADDRESS",
        0x0E03 => "PR_DISPLAY_CC",
        0x0E04 => "PR_DISPLAY_TO",
        0x0E06 => "PR_MESSAGE_DELIVERY_TIME",
        0x0E07 => "PR_MESSAGE_FLAGS",
        0x0E08 => "PR_MESSAGE_SIZE",
        0x0E1D => "PR_SUBJECT_NORMALIZED",
        0x0FF9 => "PR_RECORD_KEY",
        0x1000 => "PR_BODY",
        0x1009 => "PR_RTF_COMPRESSED",
        0x1013 => "PR_BODY_HTML",
        0x1035 => "PR_INTERNET_MESSAGE_ID",
        0x1039 => "PR_INTERNET_CPID",
        0x3001 => "PR_DISPLAY_NAME",
        0x3007 => "PR_CREATION_TIME",
        0x3008 => "PR_LAST_MODIFICATION_TIME",
        0x300B => "PR_SEARCH_KEY",
        0x3701 => "PR_ATTACH_DATA_OBJ",
        0x3702 => "PR_ATTACH_ENCODING",
        0x3703 => "PR_ATTACH_EXTENSION",
        0x3704 => "PR_ATTACH_FILENAME",
        0x3705 => "PR_ATTACH_METHOD",
        0x3707 => "PR_ATTACH_LONG_FILENAME",
        0x3709 => "PR_ATTACH_RENDERING",
        0x370B => "PR_RENDERING_POSITION",
        0x370E => "PR_ATTACH_MIME_TAG",
        0x3712 => "PR_ATTACH_CONTENT_ID",
        0x3714 => "PR_ATTACH_FLAGS",
        _ => "",
    }
}

/// Symbolic name of a MAPI property type, or its hex value when unknown.
pub fn type_name(prop_type: u16) -> String {
    let name = match prop_type {
        PT_SHORT => "PT_SHORT",
        PT_LONG => "PT_LONG",
        PT_FLOAT => "PT_FLOAT",
        PT_DOUBLE => "PT_DOUBLE",
        PT_CURRENCY => "PT_CURRENCY",
        PT_APPTIME => "PT_APPTIME",
        PT_ERROR => "PT_ERROR",
        PT_BOOLEAN => "PT_BOOLEAN",
        PT_OBJECT => "PT_OBJECT",
        PT_I8 => "PT_I8",
        PT_STRING8 => "PT_STRING8",
        PT_UNICODE => "PT_UNICODE",
        PT_SYSTIME => "PT_SYSTIME",
        PT_CLSID => "PT_CLSID",
        PT_BINARY => "PT_BINARY",
        other => return format!("0x{other:04X}"),
    };
    name.to_string()
}
