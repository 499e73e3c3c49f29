//! Flatten a message tree into named files.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;

use super::ExportOptions;
use crate::model::attachment::UNNAMED;
use crate::model::{Attachment, Message};

/// Longest file name produced by [`sanitize_filename`], in characters.
const MAX_NAME_LEN: usize = 200;

/// Whether a file carries a message body or attachment content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Body,
    Attachment,
}

/// One output file.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertedFile {
    pub name: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub category: FileCategory,
}

impl ConvertedFile {
    fn new(name: String, data: &[u8], category: FileCategory) -> Self {
        Self {
            name,
            data: data.to_vec(),
            category,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Collect every body and attachment of `msg`, recursing into embedded
/// messages.
///
/// Files from an embedded message are prefixed with the sanitized name of
/// the attachment that carried it (`forward.msg_body.txt`). When enabled,
/// `cid:` references in each message's HTML bodies are rewritten to
/// `data:` URIs first, which is why the message is taken mutably.
pub fn collect_files(msg: &mut Message, options: &ExportOptions) -> Vec<ConvertedFile> {
    let mut files = Vec::new();
    collect_into(msg, "", options, &mut files);
    files
}

fn collect_into(
    msg: &mut Message,
    prefix: &str,
    options: &ExportOptions,
    files: &mut Vec<ConvertedFile>,
) {
    if options.resolve_content_ids
        && (!msg.body_html.is_empty() || !msg.body_rtf_html.is_empty())
    {
        msg.resolve_content_references(inline_attachment);
    }

    let bodies: [(&str, &[u8]); 4] = [
        ("body.txt", msg.body.as_slice()),
        ("body.html", msg.body_html.as_slice()),
        ("body.rtf", if options.include_rtf { msg.body_rtf.as_slice() } else { &[] }),
        ("body_from_rtf.html", msg.body_rtf_html.as_slice()),
    ];
    for (name, data) in bodies {
        if !data.is_empty() {
            files.push(ConvertedFile::new(
                prefixed(prefix, name),
                data,
                FileCategory::Body,
            ));
        }
    }

    for att in &mut msg.attachments {
        let name = prefixed(prefix, &sanitize_filename(att.filename()));
        if let Some(inner) = att.embedded.as_deref_mut() {
            collect_into(inner, &name, options, files);
        } else if !att.data.is_empty() {
            files.push(ConvertedFile::new(name, &att.data, FileCategory::Attachment));
        } else {
            tracing::debug!(filename = %att.filename(), "Skipping empty attachment");
        }
    }
}

/// `data:` URI for an attachment, or `""` when it has no content.
fn inline_attachment(att: &Attachment) -> String {
    if att.data.is_empty() {
        return String::new();
    }
    let mime = if att.mime_type.is_empty() {
        mime_from_name(att.filename())
    } else {
        att.mime_type.as_str()
    };
    data_uri(mime, &att.data)
}

fn prefixed(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

/// Base64 `data:` URI for `data` with the given MIME type.
pub fn data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(data))
}

/// Make a name safe to use as a single path component.
///
/// Control characters are dropped, path separators and characters
/// reserved on Windows become `_`, and the result is truncated. Empty and
/// dot-only names become `"unnamed"`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .take(MAX_NAME_LEN)
        .collect();
    let sanitized = sanitized.trim();

    if sanitized.chars().all(|c| c == '.') {
        UNNAMED.to_string()
    } else {
        sanitized.to_string()
    }
}

/// MIME type guessed from a file extension.
pub fn mime_from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, data: &[u8]) -> Attachment {
        Attachment {
            long_name: name.to_string(),
            data: data.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("a:b*c?.txt"), "a_b_c_.txt");
        assert_eq!(sanitize_filename("tab\there\n"), "tabhere");
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename(".."), "unnamed");
        assert_eq!(sanitize_filename("  "), "unnamed");
        assert_eq!(sanitize_filename(&"x".repeat(500)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_mime_from_name() {
        assert_eq!(mime_from_name("logo.PNG"), "image/png");
        assert_eq!(mime_from_name("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_from_name("README"), "application/octet-stream");
        assert_eq!(mime_from_name("archive.tar.gz"), "application/octet-stream");
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_collect_bodies_and_attachments() {
        let mut msg = Message {
            body: b"hello".to_vec(),
            body_rtf: b"{\\rtf1}".to_vec(),
            attachments: vec![attachment("a.txt", &[1, 2, 3]), attachment("empty", &[])],
            ..Default::default()
        };
        let files = collect_files(&mut msg, &ExportOptions::default());
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["body.txt", "body.rtf", "a.txt"]);
        assert_eq!(files[0].category, FileCategory::Body);
        assert_eq!(files[2].category, FileCategory::Attachment);
        assert_eq!(files[2].data, [1, 2, 3]);

        let no_rtf = ExportOptions {
            include_rtf: false,
            ..Default::default()
        };
        let files = collect_files(&mut msg, &no_rtf);
        assert!(files.iter().all(|f| f.name != "body.rtf"));
    }

    #[test]
    fn test_collect_resolves_content_ids() {
        let mut img = attachment("logo.png", b"abc");
        img.content_id = "logo".to_string();
        let mut msg = Message {
            body_html: b"<img src=\"cid:logo\">".to_vec(),
            attachments: vec![img],
            ..Default::default()
        };
        let files = collect_files(&mut msg, &ExportOptions::default());
        assert_eq!(files[0].name, "body.html");
        assert_eq!(
            files[0].data,
            b"<img src=\"data:image/png;base64,YWJj\">".to_vec()
        );
        // The image itself is still exported.
        assert_eq!(files[1].name, "logo.png");
    }

    #[test]
    fn test_collect_keeps_cid_when_disabled() {
        let mut img = attachment("logo.png", b"abc");
        img.content_id = "logo".to_string();
        let mut msg = Message {
            body_html: b"cid:logo".to_vec(),
            attachments: vec![img],
            ..Default::default()
        };
        let options = ExportOptions {
            resolve_content_ids: false,
            ..Default::default()
        };
        let files = collect_files(&mut msg, &options);
        assert_eq!(files[0].data, b"cid:logo".to_vec());
    }

    #[test]
    fn test_collect_prefixes_embedded_messages() {
        let inner = Message {
            body: b"inner".to_vec(),
            attachments: vec![attachment("deep.bin", &[9])],
            ..Default::default()
        };
        let mut carrier = attachment("Fwd: report", b"raw tnef");
        carrier.embedded = Some(Box::new(inner));
        let mut msg = Message {
            body: b"outer".to_vec(),
            attachments: vec![carrier],
            ..Default::default()
        };
        let files = collect_files(&mut msg, &ExportOptions::default());
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["body.txt", "Fwd_ report_body.txt", "Fwd_ report_deep.bin"]
        );
    }
}
