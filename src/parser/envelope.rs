//! TNEF envelope walker.
//!
//! ```text
//! signature: u32 = 0x223E9F78
//! key:       u16
//! records:
//!   level:    u8   (1 = message, 2 = attachment)
//!   id:       u16
//!   type:     u16
//!   length:   u32
//!   payload:  [u8; length]
//!   checksum: u16  (read past, not enforced)
//! ```
//!
//! A record running past the end of the input ends the walk; whatever was
//! decoded up to that point is returned. The only hard failure is a missing
//! signature.

use tracing::{debug, trace};

use super::lzfu;
use super::mapi::decode_properties;
use super::reader::{le_u32, ByteReader};
use super::rtf_html::recover_html;
use crate::error::{Result, TnefError};
use crate::model::property::{
    clean_string, PR_ATTACH_CONTENT_ID, PR_ATTACH_DATA_OBJ, PR_ATTACH_FILENAME,
    PR_ATTACH_LONG_FILENAME, PR_ATTACH_METHOD, PR_ATTACH_MIME_TAG, PR_BODY, PR_BODY_HTML,
    PR_RTF_COMPRESSED,
};
use crate::model::{AttachMethod, Attachment, Message};

/// Magic number at offset 0 of every TNEF stream.
pub const TNEF_SIGNATURE: u32 = 0x223E_9F78;

pub const LVL_MESSAGE: u8 = 0x01;
pub const LVL_ATTACHMENT: u8 = 0x02;

pub const ATT_ATTACH_DATA: u16 = 0x800F;
pub const ATT_ATTACH_TITLE: u16 = 0x8010;
pub const ATT_ATTACH_REND_DATA: u16 = 0x9002;
pub const ATT_MAPI_PROPS: u16 = 0x9003;
pub const ATT_ATTACHMENT: u16 = 0x9005;

/// Signature plus the two-byte key.
pub const STREAM_HEADER_LEN: usize = 6;

/// Some producers prefix embedded TNEF in `PR_ATTACH_DATA_OBJ` with an IID.
const IID_LEN: usize = 16;

/// Default limit on nested embedded messages.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Whether `data` starts with the TNEF signature.
pub fn is_tnef(data: &[u8]) -> bool {
    le_u32(data) == Some(TNEF_SIGNATURE)
}

/// Symbolic name of a TNEF attribute id, or `""` when unknown.
pub fn attribute_name(id: u16) -> &'static str {
    match id {
        0x8005 => "attDateSent",
        0x8006 => "attDateRecd",
        0x8008 => "attMessageClass",
        0x8009 => "attMessageID",
        0x800C => "attBody",
        0x800D => "attPriority",
        0x800F => "attAttachData",
        0x8010 => "attAttachTitle",
        0x8011 => "attAttachMetaFile",
        0x8012 => "attAttachCreateDate",
        0x8013 => "attAttachModifyDate",
        0x8020 => "attDateModified",
        0x9001 => "attFrom",
        0x9002 => "attAttachRendData",
        0x9003 => "attMAPIProps",
        0x9004 => "attRecipTable",
        0x9005 => "attAttachment",
        0x9006 => "attTnefVersion",
        0x9007 => "attOemCodepage",
        _ => "",
    }
}

// ── Records ─────────────────────────────────────────────────────

/// One attribute record of the envelope.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Offset of the record's level byte in the stream.
    pub offset: usize,
    pub level: u8,
    pub id: u16,
    /// Attribute type; carried in the stream, unused for decoding.
    pub attr_type: u16,
    pub payload: &'a [u8],
    pub checksum: u16,
}

impl Record<'_> {
    /// Whether the trailer equals the sum of the payload bytes (mod 2^16).
    pub fn checksum_ok(&self) -> bool {
        let sum = self
            .payload
            .iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
        sum == self.checksum
    }
}

/// Iterator over the records of a TNEF stream.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    data: &'a [u8],
    pos: usize,
    truncated_at: Option<usize>,
}

impl<'a> Records<'a> {
    /// Offset of the record that ran past the end of the input, if any.
    pub fn truncated_at(&self) -> Option<usize> {
        self.truncated_at
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        if self.truncated_at.is_some() || self.pos >= self.data.len() {
            return None;
        }
        let offset = self.pos;
        let mut reader = ByteReader::at(self.data, offset);

        let header = (
            reader.read_u8(),
            reader.read_u16(),
            reader.read_u16(),
            reader.read_u32(),
        );
        let (Some(level), Some(id), Some(attr_type), Some(len)) = header else {
            self.truncated_at = Some(offset);
            self.pos = self.data.len();
            return None;
        };

        let (Some(payload), Some(checksum)) = (reader.take(len as usize), reader.read_u16())
        else {
            self.truncated_at = Some(offset);
            self.pos = self.data.len();
            return None;
        };

        self.pos = reader.position();
        Some(Record {
            offset,
            level,
            id,
            attr_type,
            payload,
            checksum,
        })
    }
}

/// Validate the signature and iterate the records that follow it.
pub fn records(data: &[u8]) -> Result<Records<'_>> {
    if data.len() < STREAM_HEADER_LEN || !is_tnef(data) {
        return Err(TnefError::BadSignature);
    }
    Ok(Records {
        data,
        pos: STREAM_HEADER_LEN,
        truncated_at: None,
    })
}

// ── Decoder ─────────────────────────────────────────────────────

/// Resource limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum nesting of embedded messages. At the limit, attachment data
    /// is kept raw and no embedded message is decoded.
    pub max_depth: usize,
    /// Ceiling on decompressed RTF size in bytes.
    pub max_rtf_size: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_rtf_size: lzfu::MAX_OUTPUT,
        }
    }
}

/// TNEF decoder with configurable limits.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecoderOptions,
}

impl Decoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decode a TNEF stream.
    pub fn decode(&self, data: &[u8]) -> Result<Message> {
        self.decode_at(data, 0)
    }

    fn decode_at(&self, data: &[u8], depth: usize) -> Result<Message> {
        let mut records = records(data)?;
        let mut msg = Message::default();

        for record in records.by_ref() {
            if record.level == LVL_ATTACHMENT && record.id == ATT_ATTACH_REND_DATA {
                msg.attachments.push(Attachment::default());
                continue;
            }

            if record.level == LVL_ATTACHMENT {
                if let Some(att) = msg.attachments.last_mut() {
                    match record.id {
                        ATT_ATTACH_TITLE => att.title = clean_string(record.payload),
                        ATT_ATTACH_DATA => att.data = record.payload.to_vec(),
                        ATT_ATTACHMENT => {
                            self.apply_attachment_properties(att, record.payload, depth)
                        }
                        other => trace!(id = other, "Ignoring attachment attribute"),
                    }
                    continue;
                }
            }

            if record.id == ATT_MAPI_PROPS {
                self.apply_message_properties(&mut msg, record.payload);
            } else {
                trace!(
                    id = record.id,
                    level = record.level,
                    name = attribute_name(record.id),
                    "Ignoring attribute"
                );
            }
        }

        if let Some(offset) = records.truncated_at() {
            debug!(offset, len = data.len(), "TNEF stream truncated");
        }

        Ok(msg)
    }

    fn apply_message_properties(&self, msg: &mut Message, payload: &[u8]) {
        let properties = decode_properties(payload);
        for prop in &properties {
            match prop.id {
                PR_BODY => msg.body = prop.data.clone(),
                PR_BODY_HTML => msg.body_html = prop.data.clone(),
                PR_RTF_COMPRESSED => {
                    match lzfu::decompress_rtf_with_limit(&prop.data, self.options.max_rtf_size) {
                        Ok(rtf) => {
                            if let Some(html) = recover_html(&rtf) {
                                msg.body_rtf_html = html;
                            }
                            msg.body_rtf = rtf;
                        }
                        Err(e) => debug!(error = %e, "Discarding compressed RTF body"),
                    }
                }
                _ => {}
            }
        }
        msg.properties.extend(properties);
    }

    fn apply_attachment_properties(&self, att: &mut Attachment, payload: &[u8], depth: usize) {
        let properties = decode_properties(payload);
        let mut data_object: Option<&[u8]> = None;

        for prop in &properties {
            match prop.id {
                PR_ATTACH_FILENAME => {
                    if att.title.is_empty() {
                        att.title = prop.as_string();
                    }
                }
                PR_ATTACH_LONG_FILENAME => att.long_name = prop.as_string(),
                PR_ATTACH_MIME_TAG => att.mime_type = prop.as_string(),
                PR_ATTACH_CONTENT_ID => att.content_id = prop.as_string(),
                PR_ATTACH_METHOD => {
                    if let Some(method) = prop.as_u32() {
                        att.method = AttachMethod::from_u32(method);
                    }
                }
                PR_ATTACH_DATA_OBJ => data_object = Some(prop.data.as_slice()),
                _ => {}
            }
        }

        if let Some(object) = data_object {
            if !object.is_empty() && att.data.is_empty() {
                self.resolve_embedded(att, object, depth);
            }
        }
        att.properties.extend(properties);
    }

    /// Decode `object` as a nested TNEF stream, with or without an IID
    /// prefix. Falls back to storing the raw bytes.
    fn resolve_embedded(&self, att: &mut Attachment, object: &[u8], depth: usize) {
        if depth >= self.options.max_depth {
            debug!(depth, "Embedded message depth limit reached, keeping raw data");
            att.data = object.to_vec();
            return;
        }

        let mut candidates: Vec<&[u8]> = Vec::with_capacity(2);
        if object.len() > IID_LEN + 4 {
            candidates.push(&object[IID_LEN..]);
        }
        candidates.push(object);

        for candidate in candidates {
            if !is_tnef(candidate) {
                continue;
            }
            if let Ok(inner) = self.decode_at(candidate, depth + 1) {
                att.data = candidate.to_vec();
                att.embedded = Some(Box::new(inner));
                return;
            }
        }

        att.data = object.to_vec();
    }
}

/// Decode a TNEF stream with default limits.
pub fn decode(data: &[u8]) -> Result<Message> {
    Decoder::default().decode(data)
}
