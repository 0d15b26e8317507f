use bytes::Bytes;

use super::error::HeaderValueError;

/// HTTP Header Field Value.
///
/// Values are opaque bytes, restricted to visible ASCII, SP, HTAB and
/// obs-text. Line folding is rejected at parse time.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderValue {
    value: Bytes,
}

impl HeaderValue {
    /// Create `HeaderValue` from a static string.
    ///
    /// # Panics
    ///
    /// Panics if the value contains a control character.
    pub const fn from_static(value: &'static str) -> HeaderValue {
        let bytes = value.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            assert!(is_value_byte(bytes[i]), "invalid header value character");
            i += 1;
        }
        Self {
            value: Bytes::from_static(bytes),
        }
    }

    /// Create `HeaderValue` from bytes, rejecting control characters.
    pub fn from_bytes(value: impl Into<Bytes>) -> Result<HeaderValue, HeaderValueError> {
        let value = value.into();
        if !value.iter().all(|&b| is_value_byte(b)) {
            return Err(HeaderValueError);
        }
        Ok(Self { value })
    }

    /// Create `HeaderValue` from a string, rejecting control characters.
    #[inline]
    pub fn from_string(value: impl Into<String>) -> Result<HeaderValue, HeaderValueError> {
        Self::from_bytes(Bytes::from(value.into().into_bytes()))
    }

    /// Returns the value bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Returns the value as `str` if it is valid UTF-8.
    #[inline]
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Consumes self into the underlying [`Bytes`].
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.value
    }
}

/// field-vchar = VCHAR / obs-text, plus SP and HTAB
const fn is_value_byte(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | 0x21..=0x7e | 0x80..=0xff)
}

impl PartialEq<[u8]> for HeaderValue {
    #[inline]
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&[u8]> for HeaderValue {
    #[inline]
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == *other
    }
}

impl PartialEq<str> for HeaderValue {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for HeaderValue {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl std::fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_str() {
            Some(s) => std::fmt::Debug::fmt(s, f),
            None => write!(f, "{:?}", self.as_bytes()),
        }
    }
}
