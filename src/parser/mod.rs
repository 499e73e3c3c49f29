//! TNEF decoding: envelope walker, MAPI property streams, compressed RTF,
//! and HTML recovery from encapsulated RTF.

mod crc32;
pub mod envelope;
pub mod lzfu;
pub mod mapi;
pub mod reader;
pub mod rtf_html;

pub use envelope::{decode, is_tnef, Decoder, DecoderOptions};
