//! Centralized error types for tnefkit.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the tnefkit library.
///
/// Decoding is best-effort: the only condition under which [`crate::decode`]
/// refuses to produce a message is a missing or short signature. Everything
/// else degrades to partial output.
#[derive(Error, Debug)]
pub enum TnefError {
    /// The input is shorter than the envelope header or lacks the TNEF magic.
    #[error("not a valid TNEF stream (bad signature)")]
    BadSignature,

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input file does not exist.
    #[error("TNEF file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors from the compressed-RTF decompressor.
///
/// These never escape [`crate::decode`]; a failing RTF body only leaves the
/// derived fields of the message empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RtfError {
    /// Fewer than the 16 header bytes are present.
    #[error("compressed RTF header truncated ({0} bytes)")]
    TooShort(usize),

    /// The header carries neither the compressed nor the uncompressed magic.
    #[error("unknown compressed RTF format 0x{0:08X}")]
    UnknownFormat(u32),
}

/// Convenience alias for `Result<T, TnefError>`.
pub type Result<T> = std::result::Result<T, TnefError>;

impl TnefError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
