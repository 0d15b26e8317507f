//! Header parsing errors.

/// Invalid header name charset.
#[derive(Debug)]
pub struct HeaderNameError;

impl std::error::Error for HeaderNameError {}

impl std::fmt::Display for HeaderNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid header name")
    }
}

/// Invalid header value charset.
#[derive(Debug)]
pub struct HeaderValueError;

impl std::error::Error for HeaderValueError {}

impl std::fmt::Display for HeaderValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid header value")
    }
}

/// Header field error.
#[derive(Debug)]
pub enum HeaderError {
    /// Invalid header name charset.
    Name(HeaderNameError),
    /// Invalid header value charset.
    Value(HeaderValueError),
    /// A typed codec could not decode the value.
    Codec(&'static str),
}

impl std::error::Error for HeaderError {}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(err) => std::fmt::Display::fmt(err, f),
            Self::Value(err) => std::fmt::Display::fmt(err, f),
            Self::Codec(what) => write!(f, "invalid header: {what}"),
        }
    }
}

impl From<HeaderNameError> for HeaderError {
    #[inline]
    fn from(value: HeaderNameError) -> Self {
        Self::Name(value)
    }
}

impl From<HeaderValueError> for HeaderError {
    #[inline]
    fn from(value: HeaderValueError) -> Self {
        Self::Value(value)
    }
}
