//! Error type for the wad layer.

use std::path::PathBuf;

use thiserror::Error;

/// The error type for container parsing, lump decoding and registry state.
///
/// Registry lookups that simply miss are *not* errors - they return `None`,
/// since absent optional lumps are a routine outcome callers handle.
#[derive(Debug, Error)]
pub enum Error {
    /// No registered device loader recognizes the container.
    #[error("no device loader recognizes '{}'", .0.display())]
    NotFound(PathBuf),

    /// Bad magic, a header field outside its documented range, or an
    /// unsupported compression method.
    #[error("format error: {0}")]
    Format(String),

    /// The container's internal structure is inconsistent: a directory entry
    /// pointing past the end of the file, a truncated compressed stream, a
    /// palette shorter than its declared entry count.
    #[error("corrupt container: {0}")]
    Corrupt(String),

    /// The underlying byte source failed after the initial open.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation was called in the wrong lifecycle phase, e.g. a
    /// global-index lookup before `Registry::merge`.
    #[error("invalid state: {0}")]
    State(&'static str),
}

impl From<ashfall_n64::DecodeError> for Error {
    fn from(err: ashfall_n64::DecodeError) -> Self {
        Error::Corrupt(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
