//! Export functionality: flatten a decoded message into files and write
//! them to a directory.

pub mod files;
pub mod writer;

pub use files::{
    collect_files, data_uri, mime_from_name, sanitize_filename, ConvertedFile, FileCategory,
};
pub use writer::write_files;

/// What to produce when flattening a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Rewrite `cid:` references in HTML bodies to `data:` URIs.
    pub resolve_content_ids: bool,
    /// Emit the decompressed RTF body as `body.rtf`.
    pub include_rtf: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolve_content_ids: true,
            include_rtf: true,
        }
    }
}
