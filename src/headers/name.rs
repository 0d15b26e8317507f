use bytes::Bytes;

use super::error::HeaderNameError;
use crate::common::ByteStr;

/// HTTP Header Field Name.
///
/// Equality is case-insensitive, the casing given at construction is
/// preserved and used on emit.
#[derive(Clone, Default)]
pub struct HeaderName {
    value: ByteStr,
}

impl HeaderName {
    /// Create `HeaderName` from a static string.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or contains a non token character.
    pub const fn from_static(value: &'static str) -> HeaderName {
        let bytes = value.as_bytes();
        assert!(!bytes.is_empty(), "header name cannot be empty");
        let mut i = 0;
        while i < bytes.len() {
            assert!(is_token(bytes[i]), "invalid header name character");
            i += 1;
        }
        Self {
            value: ByteStr::from_static(value),
        }
    }

    /// Create `HeaderName` from bytes, validating the token charset.
    pub fn from_bytes(value: impl Into<Bytes>) -> Result<HeaderName, HeaderNameError> {
        let bytes = value.into();
        if bytes.is_empty() || !bytes.iter().all(|&b| is_token(b)) {
            return Err(HeaderNameError);
        }
        // SAFETY: token characters are a subset of ASCII
        let value = unsafe { ByteStr::from_utf8_unchecked(bytes) };
        Ok(Self { value })
    }

    /// Returns the name with the casing given at construction.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the name bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Case-insensitive comparison against any string.
    #[inline]
    pub fn matches(&self, other: &str) -> bool {
        self.value.as_bytes().eq_ignore_ascii_case(other.as_bytes())
    }
}

/// token = 1*tchar
const fn is_token(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*'
        | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
    ) || byte.is_ascii_alphanumeric()
}

impl PartialEq for HeaderName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value.as_bytes().eq_ignore_ascii_case(other.value.as_bytes())
    }
}

impl Eq for HeaderName {}

impl PartialEq<str> for HeaderName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for HeaderName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

impl std::fmt::Debug for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
