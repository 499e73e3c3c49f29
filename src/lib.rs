//! `tnefkit`: decode TNEF (`winmail.dat`) attachments.
//!
//! This crate provides the core library for walking TNEF streams, decoding
//! MAPI properties, decompressing RTF bodies, recovering HTML from
//! encapsulated RTF, and exporting the result as plain files.
//!
//! ```no_run
//! let data = std::fs::read("winmail.dat")?;
//! let msg = tnefkit::decode(&data)?;
//! for att in msg.attachments() {
//!     println!("{} ({} bytes)", att.filename(), att.size());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

pub mod config;
pub mod error;
pub mod export;
pub mod inspect;
pub mod model;
pub mod parser;

pub use error::{Result, TnefError};
pub use model::{AttachMethod, Attachment, Message, Property};
pub use parser::{decode, is_tnef, Decoder, DecoderOptions};

/// Read and decode a TNEF file with the given decoder.
pub fn decode_file(decoder: &Decoder, path: impl AsRef<Path>) -> Result<Message> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TnefError::FileNotFound(path.to_path_buf())
        } else {
            TnefError::io(path, e)
        }
    })?;
    tracing::debug!(path = %path.display(), len = data.len(), "Decoding TNEF file");
    decoder.decode(&data)
}
