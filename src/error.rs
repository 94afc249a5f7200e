use thiserror::Error;

/// Errors raised while parsing a single BDMV metadata file.
///
/// Any of these aborts the file at hand, never the whole disc scan; the
/// scan driver captures them into [`Warning`]s on the aggregate result.
///
/// [`Warning`]: ../types/struct.Warning.html
#[derive(Error, Debug)]
pub enum ParseError {
    /// An I/O error occurred while reading the file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A read ran past the end of the buffer.
    #[error("read out of bounds at offset {offset}, wanted {want} bytes")]
    Bounds { offset: usize, want: usize },
    /// The file does not start with the expected 4-byte magic.
    #[error("bad magic: expected {expected:?}, got {got:?}")]
    MagicMismatch { expected: &'static str, got: String },
    /// A section declared more bytes than the buffer has left.
    #[error("{section} length {declared} overruns remaining {remaining} bytes")]
    LengthOverflow {
        section: &'static str,
        declared: u64,
        remaining: usize,
    },
    /// The 4-byte version field is not one this crate understands.
    #[error("unsupported format version {got:?}")]
    UnsupportedVersion { got: String },
    /// A section body did not match its grammar.
    #[error("malformed {section} at offset {offset}")]
    Malformed {
        section: &'static str,
        offset: usize,
    },
}

/// A non-fatal condition noticed while parsing one file, before the scan
/// driver attaches the file name as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub code: crate::types::WarningCode,
    pub message: String,
}

impl ParseWarning {
    pub fn new(code: crate::types::WarningCode, message: impl Into<String>) -> Self {
        ParseWarning {
            code,
            message: message.into(),
        }
    }
}
