//! Decoded TNEF message and content-reference resolution.

use super::attachment::Attachment;
use super::property::{
    clean_string, Property, PR_DISPLAY_CC, PR_DISPLAY_TO, PR_SENDER_EMAIL_ADDRESS,
    PR_SENDER_NAME, PR_SUBJECT,
};

/// Prefix of an HTML content reference (`cid:<content-id>`).
const CID_PREFIX: &[u8] = b"cid:";

/// The decoded contents of a TNEF stream.
///
/// A message is the root of a tree: it owns its attachments, which in turn
/// may own embedded messages.
///
/// Serializes with body buffers reduced to their sizes.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Message {
    /// Plain-text body (`PR_BODY`).
    #[serde(rename = "body_size", serialize_with = "super::serialize_len")]
    pub body: Vec<u8>,

    /// HTML body (`PR_BODY_HTML`).
    #[serde(rename = "body_html_size", serialize_with = "super::serialize_len")]
    pub body_html: Vec<u8>,

    /// Decompressed RTF body (from `PR_RTF_COMPRESSED`).
    #[serde(rename = "body_rtf_size", serialize_with = "super::serialize_len")]
    pub body_rtf: Vec<u8>,

    /// HTML recovered from `\fromhtml1` RTF, when the RTF encapsulates HTML.
    #[serde(rename = "body_rtf_html_size", serialize_with = "super::serialize_len")]
    pub body_rtf_html: Vec<u8>,

    /// File, embedded-message and OLE attachments in stream order.
    pub attachments: Vec<Attachment>,

    /// Every message-level property, in stream order.
    pub properties: Vec<Property>,
}

impl Message {
    /// First property with the given id.
    pub fn property(&self, id: u16) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// String value of the first property with the given id, NUL-stripped
    /// and trimmed. Empty when the property is absent.
    pub fn property_string(&self, id: u16) -> String {
        self.property(id)
            .map(|p| clean_string(&p.data))
            .unwrap_or_default()
    }

    pub fn subject(&self) -> String {
        self.property_string(PR_SUBJECT)
    }

    pub fn sender_name(&self) -> String {
        self.property_string(PR_SENDER_NAME)
    }

    pub fn sender_email(&self) -> String {
        self.property_string(PR_SENDER_EMAIL_ADDRESS)
    }

    pub fn display_to(&self) -> String {
        self.property_string(PR_DISPLAY_TO)
    }

    pub fn display_cc(&self) -> String {
        self.property_string(PR_DISPLAY_CC)
    }

    /// Attachments in stream order.
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter()
    }

    /// Messages embedded directly in this message's attachments.
    pub fn embedded_messages(&self) -> impl Iterator<Item = &Message> {
        self.attachments.iter().filter_map(|a| a.embedded.as_deref())
    }

    /// Whether any body variant is present.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
            || !self.body_html.is_empty()
            || !self.body_rtf.is_empty()
            || !self.body_rtf_html.is_empty()
    }

    /// Visit this message and every embedded message, depth first.
    pub fn for_each_message_mut(&mut self, f: &mut dyn FnMut(&mut Message)) {
        f(self);
        for att in &mut self.attachments {
            if let Some(inner) = att.embedded.as_deref_mut() {
                inner.for_each_message_mut(f);
            }
        }
    }

    /// Replace `cid:<id>` references in both HTML bodies.
    ///
    /// `mapper` is called for every attachment with a non-empty content id;
    /// an empty replacement leaves that reference untouched. Embedded
    /// messages are not visited; call this per message in the tree.
    pub fn resolve_content_references<F>(&mut self, mut mapper: F)
    where
        F: FnMut(&Attachment) -> String,
    {
        let mut table: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        for att in &self.attachments {
            if att.content_id.is_empty() {
                continue;
            }
            let replacement = mapper(att);
            if replacement.is_empty() {
                continue;
            }
            let key = att.content_id.as_bytes().to_vec();
            // Later attachments win for duplicate ids.
            table.retain(|(k, _)| *k != key);
            table.push((key, replacement.into_bytes()));
        }
        if table.is_empty() {
            return;
        }
        // Longest id first so `img10` is not consumed by `img1`.
        table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        self.body_html = replace_content_ids(&self.body_html, &table);
        self.body_rtf_html = replace_content_ids(&self.body_rtf_html, &table);
    }
}

/// Single left-to-right pass substituting `cid:<id>` occurrences.
///
/// Replacement text is never rescanned.
fn replace_content_ids(html: &[u8], table: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
    if html.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(html.len());
    let mut i = 0;
    while i < html.len() {
        if html[i..].starts_with(CID_PREFIX) {
            let rest = &html[i + CID_PREFIX.len()..];
            if let Some((key, value)) = table.iter().find(|(k, _)| rest.starts_with(k)) {
                out.extend_from_slice(value);
                i += CID_PREFIX.len() + key.len();
                continue;
            }
        }
        out.push(html[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property::PT_STRING8;

    fn with_image(cid: &str) -> Attachment {
        Attachment {
            title: format!("{cid}.png"),
            content_id: cid.to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
            ..Default::default()
        }
    }

    #[test]
    fn test_property_lookup() {
        let msg = Message {
            properties: vec![
                Property {
                    prop_type: PT_STRING8,
                    multi_valued: false,
                    id: PR_SUBJECT,
                    name: None,
                    data: b"Lunch\0".to_vec(),
                },
                Property {
                    prop_type: PT_STRING8,
                    multi_valued: false,
                    id: PR_SUBJECT,
                    name: None,
                    data: b"Second\0".to_vec(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(msg.subject(), "Lunch");
        assert_eq!(msg.sender_name(), "");
        assert!(msg.property(0x1234).is_none());
    }

    #[test]
    fn test_resolve_content_references() {
        let mut msg = Message {
            body_html: b"<img src=\"cid:img1\">".to_vec(),
            body_rtf_html: b"<p><img src=\"cid:img1\"></p>".to_vec(),
            attachments: vec![with_image("img1")],
            ..Default::default()
        };
        msg.resolve_content_references(|_| "X".to_string());
        assert_eq!(msg.body_html, b"<img src=\"X\">");
        assert_eq!(msg.body_rtf_html, b"<p><img src=\"X\"></p>");
    }

    #[test]
    fn test_resolve_prefers_longest_id() {
        let mut msg = Message {
            body_html: b"cid:img1 cid:img10 cid:other".to_vec(),
            attachments: vec![with_image("img1"), with_image("img10")],
            ..Default::default()
        };
        msg.resolve_content_references(|a| a.title.clone());
        assert_eq!(msg.body_html, b"img1.png img10.png cid:other");
    }

    #[test]
    fn test_resolve_skips_empty_replacement() {
        let mut msg = Message {
            body_html: b"cid:img1".to_vec(),
            attachments: vec![with_image("img1")],
            ..Default::default()
        };
        msg.resolve_content_references(|_| String::new());
        assert_eq!(msg.body_html, b"cid:img1");
    }

    #[test]
    fn test_resolve_is_not_recursive() {
        let inner = Message {
            body_html: b"cid:img1".to_vec(),
            attachments: vec![with_image("img1")],
            ..Default::default()
        };
        let mut outer = Message {
            attachments: vec![Attachment {
                embedded: Some(Box::new(inner)),
                ..with_image("img1")
            }],
            ..Default::default()
        };
        outer.resolve_content_references(|_| "X".to_string());
        let inner = outer.embedded_messages().next().unwrap();
        assert_eq!(inner.body_html, b"cid:img1");

        let mut visited = 0;
        outer.for_each_message_mut(&mut |m| {
            visited += 1;
            m.resolve_content_references(|_| "X".to_string());
        });
        assert_eq!(visited, 2);
        assert_eq!(outer.embedded_messages().next().unwrap().body_html, b"X");
    }

    #[test]
    fn test_json_carries_sizes_not_bytes() {
        let msg = Message {
            body: b"hello".to_vec(),
            attachments: vec![with_image("logo")],
            properties: vec![Property {
                prop_type: PT_STRING8,
                multi_valued: false,
                id: PR_SUBJECT,
                name: None,
                data: b"Hi\0".to_vec(),
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("body").is_none());
        assert_eq!(json["body_size"], 5);
        assert_eq!(json["body_html_size"], 0);

        let att = &json["attachments"][0];
        assert_eq!(att["size"], 4);
        assert_eq!(att["content_id"], "logo");
        assert_eq!(att["method"], "none");
        assert!(att.get("embedded").is_none());

        let prop = &json["properties"][0];
        assert_eq!(prop["id"], PR_SUBJECT);
        assert_eq!(prop["size"], 3);
        assert!(prop.get("name").is_none());
    }
}
