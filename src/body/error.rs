//! Message body errors.
use crate::BoxError;

/// Message body error.
#[derive(Debug)]
pub enum BodyError {
    /// Invalid or duplicate `Content-Length` value.
    InvalidContentLength,
    /// `Content-Length` combined with `Transfer-Encoding`.
    InvalidCodings,
    /// Unknown or unsupported `Transfer-Encoding` codings.
    UnknownCodings,
    /// Malformed chunked framing.
    InvalidChunked,
    /// A single chunk exceeds the supported size.
    ChunkTooLarge,
    /// The body produced more bytes than its declared length.
    InvalidSizeHint,
    /// The peer went away mid body.
    Io(std::io::Error),
    /// A user supplied body stream failed.
    Stream(BoxError),
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Stream(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for BodyError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::InvalidContentLength => f.write_str("invalid content length"),
            Self::InvalidCodings => f.write_str("invalid message body codings"),
            Self::UnknownCodings => f.write_str("unknown or unsupported message body codings"),
            Self::InvalidChunked => f.write_str("invalid chunked framing"),
            Self::ChunkTooLarge => f.write_str("chunk too large"),
            Self::InvalidSizeHint => f.write_str("body exceeded its declared length"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Stream(err) => write!(f, "body stream error: {err}"),
        }
    }
}

impl From<std::io::Error> for BodyError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
