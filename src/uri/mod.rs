//! Request targets and path handling ([RFC3986]).
//!
//! The server reconstructs an origin-form request target into a [`Uri`]
//! using the `Host` header for the authority.
//!
//! [RFC3986]: <https://www.rfc-editor.org/rfc/rfc3986.html>
mod path;

pub use path::{normalize_path, query_pairs};

use crate::common::ByteStr;

/// Scheme of a reconstructed request target.
///
/// The engine is handed an already established byte stream, so the scheme
/// only records whether that stream was annotated as secure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Returns the scheme name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Reconstructed request target.
#[derive(Debug, Clone, Default)]
pub struct Uri {
    scheme: Scheme,
    authority: ByteStr,
    path: ByteStr,
    query: Option<ByteStr>,
}

impl Uri {
    /// Create a `Uri` from its parts.
    pub fn new(scheme: Scheme, authority: ByteStr, path: ByteStr, query: Option<ByteStr>) -> Uri {
        Self {
            scheme,
            authority,
            path,
            query,
        }
    }

    /// Split an origin-form target (`/path?query`) into path and query.
    pub fn split_target(target: ByteStr) -> (ByteStr, Option<ByteStr>) {
        match target.as_bytes().iter().position(|&b| b == b'?') {
            Some(at) => {
                let bytes = target.into_bytes();
                let path = bytes.slice(..at);
                let query = bytes.slice(at + 1..);
                // SAFETY: split on an ASCII byte of a valid UTF-8 string
                unsafe {
                    (
                        ByteStr::from_utf8_unchecked(path),
                        Some(ByteStr::from_utf8_unchecked(query)),
                    )
                }
            }
            None => (target, None),
        }
    }

    /// Returns the scheme.
    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the authority.
    #[inline]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns the raw, undecoded path.
    #[inline]
    pub fn path(&self) -> &str {
        if self.path.is_empty() { "/" } else { &self.path }
    }

    /// Returns the raw query string, without the leading `?`.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme.as_str(), self.authority, self.path())?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}
