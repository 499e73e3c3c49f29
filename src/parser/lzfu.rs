//! Compressed RTF (`PR_RTF_COMPRESSED`) decompression.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (16 bytes, little-endian)     │
//! │  compressed_size: u32                │
//! │  raw_size: u32                       │
//! │  magic: u32  "LZFu" | "MELA"         │
//! │  crc: u32                            │
//! ├──────────────────────────────────────┤
//! │ PAYLOAD                              │
//! └──────────────────────────────────────┘
//! ```
//!
//! "MELA" streams store the RTF as-is. "LZFu" streams are an LZ77 variant
//! over a 4096-byte ring buffer that starts out holding a fixed RTF preamble.
//! Each control byte describes the next eight tokens, least significant bit
//! first: a clear bit is a literal byte, a set bit is a two-byte dictionary
//! reference (12-bit offset, 4-bit length minus two).

use tracing::debug;

use super::crc32;
use super::reader::ByteReader;
use crate::error::RtfError;

/// Magic of a compressed stream (`"LZFu"`).
pub const COMPRESSED_MAGIC: u32 = 0x7546_5A4C;

/// Magic of an uncompressed stream (`"MELA"`).
pub const UNCOMPRESSED_MAGIC: u32 = 0x414C_454D;

/// Size of the stream header.
pub const HEADER_LEN: usize = 16;

/// Size of the ring buffer.
pub const DICT_SIZE: usize = 4096;

/// Hard ceiling on decompressed output, whatever the header declares.
pub const MAX_OUTPUT: usize = 64 << 20;

/// Initial ring buffer contents; the write cursor starts right after it.
pub const INIT_DICT: &[u8; 207] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}\
{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \
\\fdecor MS Sans SerifSymbolArialTimes New Roman\
Courier{\\colortbl\\red0\\green0\\blue0\r\n\\par \
\\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtfHeader {
    /// Size of everything after this field (header remainder + payload).
    pub compressed_size: u32,
    pub raw_size: u32,
    pub magic: u32,
    pub crc: u32,
}

impl RtfHeader {
    pub fn parse(data: &[u8]) -> Result<Self, RtfError> {
        let mut reader = ByteReader::new(data);
        match (
            reader.read_u32(),
            reader.read_u32(),
            reader.read_u32(),
            reader.read_u32(),
        ) {
            (Some(compressed_size), Some(raw_size), Some(magic), Some(crc)) => Ok(Self {
                compressed_size,
                raw_size,
                magic,
                crc,
            }),
            _ => Err(RtfError::TooShort(data.len())),
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.magic == COMPRESSED_MAGIC
    }
}

/// Decompress a `PR_RTF_COMPRESSED` value with the default output ceiling.
pub fn decompress_rtf(data: &[u8]) -> Result<Vec<u8>, RtfError> {
    decompress_rtf_with_limit(data, MAX_OUTPUT)
}

/// Decompress a `PR_RTF_COMPRESSED` value.
///
/// Output never exceeds `min(raw_size, max_output)`. A CRC mismatch is
/// logged and otherwise ignored: producers disagree on the covered range.
pub fn decompress_rtf_with_limit(data: &[u8], max_output: usize) -> Result<Vec<u8>, RtfError> {
    let header = RtfHeader::parse(data)?;
    let payload = &data[HEADER_LEN..];
    let limit = (header.raw_size as usize).min(max_output);

    match header.magic {
        UNCOMPRESSED_MAGIC => Ok(payload[..limit.min(payload.len())].to_vec()),
        COMPRESSED_MAGIC => {
            verify_crc(data, &header);
            Ok(decompress_lzfu(payload, limit))
        }
        other => Err(RtfError::UnknownFormat(other)),
    }
}

/// Check the payload CRC over `16..compressed_size + 4`, clamped to the input.
fn verify_crc(data: &[u8], header: &RtfHeader) -> bool {
    let end = (header.compressed_size as usize)
        .saturating_add(4)
        .min(data.len());
    if end <= HEADER_LEN {
        return false;
    }
    let actual = crc32::checksum(&data[HEADER_LEN..end]);
    let ok = actual == header.crc;
    if !ok {
        debug!(
            expected = format_args!("0x{:08X}", header.crc),
            actual = format_args!("0x{actual:08X}"),
            "Compressed RTF CRC mismatch, decompressing anyway"
        );
    }
    ok
}

/// Core LZFu loop. Stops at the end-of-stream reference, at the end of
/// input, or once `limit` bytes have been produced.
fn decompress_lzfu(input: &[u8], limit: usize) -> Vec<u8> {
    let mut dict = [0u8; DICT_SIZE];
    dict[..INIT_DICT.len()].copy_from_slice(INIT_DICT);
    let mut cursor = INIT_DICT.len();

    let mut out = Vec::with_capacity(limit.min(input.len().saturating_mul(4)));
    let mut pos = 0;

    while pos < input.len() && out.len() < limit {
        let control = input[pos];
        pos += 1;

        for bit in 0..8 {
            if pos >= input.len() || out.len() >= limit {
                return out;
            }

            if control & (1 << bit) == 0 {
                let b = input[pos];
                pos += 1;
                out.push(b);
                dict[cursor] = b;
                cursor = (cursor + 1) % DICT_SIZE;
                continue;
            }

            if pos + 1 >= input.len() {
                return out;
            }
            let hi = input[pos] as usize;
            let lo = input[pos + 1] as usize;
            pos += 2;

            let offset = (hi << 4) | (lo >> 4);
            let length = (lo & 0x0F) + 2;

            if offset == cursor {
                return out;
            }

            // Byte by byte: the source may overlap bytes written by this copy.
            for i in 0..length {
                if out.len() >= limit {
                    return out;
                }
                let b = dict[(offset + i) % DICT_SIZE];
                out.push(b);
                dict[cursor] = b;
                cursor = (cursor + 1) % DICT_SIZE;
            }
        }
    }

    out
}
