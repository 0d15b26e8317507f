use bytes::Bytes;
use std::{ops::Deref, str::Utf8Error};

/// Immutable `str` backed by [`Bytes`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteStr(Bytes);

impl ByteStr {
    /// Create new empty `ByteStr`.
    #[inline]
    pub const fn new() -> Self {
        Self(Bytes::new())
    }

    /// Create `ByteStr` from a static string slice.
    #[inline]
    pub const fn from_static(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }

    /// Create `ByteStr` from [`Bytes`], validating UTF-8.
    pub fn from_utf8(bytes: impl Into<Bytes>) -> Result<ByteStr, Utf8Error> {
        let bytes = bytes.into();
        std::str::from_utf8(bytes.as_ref())?;
        Ok(Self(bytes))
    }

    /// Create `ByteStr` from [`Bytes`] without validating UTF-8.
    ///
    /// # Safety
    ///
    /// The bytes must be valid UTF-8.
    #[inline]
    pub const unsafe fn from_utf8_unchecked(bytes: Bytes) -> ByteStr {
        Self(bytes)
    }

    /// Returns the `str` representation.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: checked at construction and immutable
        unsafe { std::str::from_utf8_unchecked(self.0.as_ref()) }
    }

    /// Returns the underlying [`Bytes`].
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Consumes self into the underlying [`Bytes`].
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for ByteStr {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl From<String> for ByteStr {
    #[inline]
    fn from(value: String) -> Self {
        Self(Bytes::from(value.into_bytes()))
    }
}

impl From<&'static str> for ByteStr {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl PartialEq<str> for ByteStr {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteStr {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl std::borrow::Borrow<str> for ByteStr {
    #[inline]
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for ByteStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self)
    }
}

impl std::fmt::Debug for ByteStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}
