//! Library-wide error and result types.
//!
//! Error messages are kept intentionally terse; callers that need richer
//! context should wrap [`Error`] in their own type. Every variant that can
//! be attributed to a specific byte carries the stream offset at which the
//! fault occurred, so a caller can map it back to a hex dump without extra
//! bookkeeping.

use std::fmt;
use std::io;

/// Result alias used throughout nw4rkit.
pub type Result<T> = std::result::Result<T, Error>;

/// The stream operation a bounds or alignment error occurred during.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOp {
    Read,
    Write,
    Peek,
}

impl fmt::Display for StreamOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOp::Read => write!(f, "read"),
            StreamOp::Write => write!(f, "write"),
            StreamOp::Peek => write!(f, "peek"),
        }
    }
}

/// All errors the library can produce.
#[derive(Debug)]
pub enum Error {
    /// A read or write would cross the end of the addressable stream.
    OutOfBounds {
        op: StreamOp,
        at: u32,
        needed: u32,
        available: u32,
    },
    /// An aligned access landed on a non-aligned offset.
    Misaligned { at: u32, align: u32 },
    /// A magic/signature field did not match the expected value.
    MagicMismatch {
        at: u32,
        expected: &'static [u8],
        got: Vec<u8>,
    },
    /// A format version is present in the data but not supported.
    UnsupportedVersion(u32),
    /// An enumeration discriminant was outside the set of values a field
    /// may legally hold.
    InvalidEnum {
        at: u32,
        value: u32,
        allowed: &'static str,
    },
    /// A string offset pointed at a region with no NUL terminator before
    /// the end of the buffer.
    TruncatedString { at: u32 },
    /// A section magic was not recognized. Non-fatal: the section is
    /// skipped and the caller is notified via the diagnostics sink.
    UnknownSection { at: u32, magic: [u8; 4] },
    /// A linker placeholder was never resolved because its target symbol
    /// was never written.
    LinkerUnresolved {
        symbol: String,
        referenced_from: String,
    },
    /// A resolved linker value did not fit in the placeholder's width.
    LinkerOverflow { symbol: String, delta: i64, width: u8 },
    /// A codec-specific structural violation (message describes which).
    DecodeError(String),
    /// The stream ended before all expected bytes could be read.
    UnexpectedEof,
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfBounds {
                op,
                at,
                needed,
                available,
            } => write!(
                f,
                "{op} of {needed} byte(s) at 0x{at:x} exceeds stream bound (available {available})"
            ),
            Error::Misaligned { at, align } => {
                write!(f, "misaligned access at 0x{at:x}: not {align}-byte aligned")
            }
            Error::MagicMismatch { at, expected, got } => write!(
                f,
                "magic mismatch at 0x{at:x}: expected {:?}, got {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(got)
            ),
            Error::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Error::InvalidEnum { at, value, allowed } => write!(
                f,
                "invalid enum value {value} (0x{value:x}) at 0x{at:x}; expected one of {allowed}"
            ),
            Error::TruncatedString { at } => {
                write!(f, "string at 0x{at:x} has no terminating NUL before end of buffer")
            }
            Error::UnknownSection { at, magic } => write!(
                f,
                "unknown section magic {:?} at 0x{at:x}",
                String::from_utf8_lossy(magic)
            ),
            Error::LinkerUnresolved {
                symbol,
                referenced_from,
            } => write!(
                f,
                "linker: symbol \"{symbol}\" referenced from \"{referenced_from}\" was never written"
            ),
            Error::LinkerOverflow { symbol, delta, width } => write!(
                f,
                "linker: resolved delta {delta} for \"{symbol}\" does not fit in {width} byte(s)"
            ),
            Error::DecodeError(msg) => write!(f, "decode error: {msg}"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
