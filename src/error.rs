use crate::parsers::TextEncoding;
use nom::error::{ErrorKind, ParseError};
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResError>;

/// Errors that can happen while reading or writing a resource file.
///
/// The engine never retries: any of these aborts the load or save in progress, and a
/// failed save leaves the destination buffer in an unspecified state.
#[derive(Debug, Error)]
pub enum ResError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A read addressed bytes past the end of the backing store.
    #[error("unexpected end of data at {position:#x} (wanted {wanted} bytes)")]
    UnexpectedEof { position: u64, wanted: usize },
    /// Only returned when signatures are checked in `SignatureCheck::Strict` mode.
    #[error("signature mismatch at {position:#x}: expected {expected:?}, found {found:?}")]
    SignatureMismatch {
        position: u64,
        expected: Vec<u8>,
        found: Vec<u8>,
    },
    #[error("dictionary has {keys} keys but {values} values")]
    CountMismatch { keys: usize, values: usize },
    /// The distance between a field and its target does not fit a signed 32-bit delta.
    #[error("offset field at {position:#x} cannot reach {target:#x}")]
    OffsetOutOfRange { position: u64, target: i64 },
    /// A pending entry still had placeholders when the file was finalized. This is an
    /// engine bug and never caused by user data.
    #[error("{kind} entry with {patches} placeholder(s) was never placed")]
    UnresolvedEntry { kind: &'static str, patches: usize },
    #[error("invalid {encoding:?} text at {position:#x}")]
    InvalidText {
        position: u64,
        encoding: TextEncoding,
    },
    #[error("alignment must be a non-zero power of two, got {0}")]
    InvalidAlignment(u64),
    #[error("parse error: {0:?}")]
    Parse(ErrorKind),
}

impl ParseError<&[u8]> for ResError {
    fn from_error_kind(_input: &[u8], kind: ErrorKind) -> Self {
        ResError::Parse(kind)
    }

    fn append(_input: &[u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<ResError>> for ResError {
    fn from(e: nom::Err<ResError>) -> Self {
        match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(_) => ResError::Parse(ErrorKind::Eof),
        }
    }
}
