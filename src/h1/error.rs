//! Connection level errors.
use super::parser::ParseError;
use crate::BoxError;
use crate::body::error::BodyError;

/// Error terminating a connection.
#[derive(Debug)]
pub enum ConnectionError {
    /// Malformed request head.
    Parse(ParseError),
    /// Invalid message body framing.
    Body(BodyError),
    /// Semantic violation of the message exchange.
    Proto(ProtoError),
    /// Transport failure.
    Io(std::io::Error),
    /// The service failed and no response could be produced.
    Service(BoxError),
    /// A configured timeout fired.
    Timeout(TimeoutKind),
}

/// HTTP semantic error.
#[derive(Debug)]
pub enum ProtoError {
    /// Too many headers.
    TooManyHeaders,
    /// Head exceeds the size cap.
    HeadTooLarge,
    /// Missing host header.
    MissingHost,
    /// The response body failed mid stream, after the head was written.
    ResponseBody(BodyError),
}

/// Which configured timeout fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    KeepAlive,
    Request,
    WriteIdle,
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Body(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Service(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Body(err) => write!(f, "body error: {err}"),
            Self::Proto(err) => write!(f, "protocol error: {err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Service(err) => write!(f, "service error: {err}"),
            Self::Timeout(kind) => write!(f, "timeout: {kind:?}"),
        }
    }
}

impl std::error::Error for ProtoError {}

impl std::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::TooManyHeaders => f.write_str("too many headers"),
            Self::HeadTooLarge => f.write_str("request head too large"),
            Self::MissingHost => f.write_str("missing host header"),
            Self::ResponseBody(err) => write!(f, "response body failed: {err}"),
        }
    }
}

impl From<ParseError> for ConnectionError {
    #[inline]
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<BodyError> for ConnectionError {
    #[inline]
    fn from(value: BodyError) -> Self {
        Self::Body(value)
    }
}

impl From<ProtoError> for ConnectionError {
    #[inline]
    fn from(value: ProtoError) -> Self {
        Self::Proto(value)
    }
}

impl From<std::io::Error> for ConnectionError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
