//! Attachments carried in a TNEF stream.

use super::message::Message;
use super::property::Property;

/// Fallback display name for attachments without any name.
pub const UNNAMED: &str = "unnamed";

/// How the attachment content is stored (`PR_ATTACH_METHOD`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachMethod {
    /// No method property was present.
    #[default]
    None,
    /// Plain file content.
    ByValue,
    /// A nested message.
    EmbeddedMessage,
    /// An OLE object.
    Ole,
    /// Any other method value.
    Other(u32),
}

impl AttachMethod {
    /// Map a raw `PR_ATTACH_METHOD` value.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::ByValue,
            5 => Self::EmbeddedMessage,
            6 => Self::Ole,
            other => Self::Other(other),
        }
    }
}

/// A single attachment: file, embedded message, or OLE object.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Attachment {
    /// Short (8.3) filename, from the title record or `PR_ATTACH_FILENAME`.
    pub title: String,

    /// Long filename (`PR_ATTACH_LONG_FILENAME`).
    pub long_name: String,

    /// Raw attachment content. For embedded messages this is the nested
    /// TNEF stream that produced [`Attachment::embedded`].
    #[serde(rename = "size", serialize_with = "super::serialize_len")]
    pub data: Vec<u8>,

    /// MIME type, if the sender supplied one.
    pub mime_type: String,

    /// Content-ID referenced from HTML bodies as `cid:<id>`.
    pub content_id: String,

    /// Storage method.
    pub method: AttachMethod,

    /// Decoded nested message, when `data` parsed as a TNEF stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded: Option<Box<Message>>,

    /// Properties decoded from the attachment's property record.
    pub properties: Vec<Property>,
}

impl Attachment {
    /// Best display name: long name, then short name, then `"unnamed"`.
    pub fn filename(&self) -> &str {
        if !self.long_name.is_empty() {
            &self.long_name
        } else if !self.title.is_empty() {
            &self.title
        } else {
            UNNAMED
        }
    }

    /// First attachment property with the given id.
    pub fn property(&self, id: u16) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// The decoded embedded message, if any.
    pub fn embedded_message(&self) -> Option<&Message> {
        self.embedded.as_deref()
    }

    /// Size of the raw content in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_preference() {
        let mut att = Attachment::default();
        assert_eq!(att.filename(), "unnamed");
        att.title = "REPORT~1.PDF".into();
        assert_eq!(att.filename(), "REPORT~1.PDF");
        att.long_name = "Report 2024.pdf".into();
        assert_eq!(att.filename(), "Report 2024.pdf");
    }

    #[test]
    fn test_attach_method_from_u32() {
        assert_eq!(AttachMethod::from_u32(1), AttachMethod::ByValue);
        assert_eq!(AttachMethod::from_u32(5), AttachMethod::EmbeddedMessage);
        assert_eq!(AttachMethod::from_u32(6), AttachMethod::Ole);
        assert_eq!(AttachMethod::from_u32(7), AttachMethod::Other(7));
    }
}
