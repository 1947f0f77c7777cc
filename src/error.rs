//! Brush parsing error types

use std::io;
use thiserror::Error;

/// Errors raised while decoding brush files.
///
/// Fatal-vs-recoverable policy: `UnrecognizedFormat` and `CorruptFile` abort
/// the whole file. `TruncatedData` is fatal at top-level header reads and
/// recoverable mid-brush. The remaining variants are caught at the narrowest
/// scope that keeps the parse moving (one brush entry or one texture frame)
/// and surface as [`Diagnostic`](crate::types::Diagnostic) entries.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("unrecognized brush file format")]
    UnrecognizedFormat,

    #[error("corrupt file: {0}")]
    CorruptFile(String),

    #[error("unexpected end of data: needed {needed} bytes, {remaining} remain")]
    TruncatedData { needed: usize, remaining: usize },

    #[error("unsupported {format} sub-version {version}")]
    UnsupportedSubVersion { format: &'static str, version: u32 },

    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("archive member not found: {0}")]
    MissingArchiveMember(String),

    #[error("declared size {width}x{height} exceeds limit {limit}")]
    DimensionOutOfRange { width: u32, height: u32, limit: u32 },
}

impl ParseError {
    /// Whether this error must abort the whole file rather than a single
    /// brush entry or frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParseError::Io(_) | ParseError::UnrecognizedFormat | ParseError::CorruptFile(_)
        )
    }
}
