//! Decoded message model: messages, attachments, and MAPI properties.

pub mod attachment;
pub mod message;
pub mod property;

pub use attachment::{AttachMethod, Attachment};
pub use message::Message;
pub use property::{Property, PropertyName};

/// Serialize a byte buffer as its length; JSON summaries carry sizes only.
pub(crate) fn serialize_len<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: serde::Serializer,
{
    serializer.serialize_u64(bytes.as_ref().len() as u64)
}
