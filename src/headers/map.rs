use super::{HeaderName, HeaderValue};

/// HTTP Headers Multimap.
///
/// Entries are kept in insertion order and iteration preserves that order,
/// duplicates included. Lookups compare names case-insensitively.
///
/// # Header Name
///
/// All operations that take a header name accept either a [`HeaderName`]
/// or a `&str`, compared case-insensitively. Prefer the constants in
/// [`standard`] for well known names.
///
/// # Complexity
///
/// Storage is a flat ordered list: lookups scan linearly. HTTP messages
/// carry few headers and the engine caps their count, where a HashDoS
/// resistant structure would buy nothing.
///
/// [`standard`]: super::standard
#[derive(Clone, Default)]
pub struct HeaderMap {
    fields: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderMap {
    /// Create new empty `HeaderMap`.
    ///
    /// This function does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create new empty `HeaderMap` with at least the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of entries, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the map holds no entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the entry capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.fields.capacity()
    }

    /// Remove all entries, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Append an entry, keeping existing entries with the same name.
    #[inline]
    pub fn append(&mut self, name: impl IntoHeaderName, value: HeaderValue) {
        self.fields.push((name.into_header_name(), value));
    }

    /// Insert an entry, replacing every existing entry with the same name.
    ///
    /// Returns the first replaced value.
    pub fn insert(
        &mut self,
        name: impl IntoHeaderName,
        value: HeaderValue,
    ) -> Option<HeaderValue> {
        let name = name.into_header_name();
        let mut replaced = None;
        self.fields.retain(|(n, v)| {
            if n == &name {
                if replaced.is_none() {
                    replaced = Some(v.clone());
                }
                false
            } else {
                true
            }
        });
        self.fields.push((name, value));
        replaced
    }

    /// Returns the first value with the given name.
    pub fn get(&self, name: impl AsHeaderName) -> Option<&HeaderValue> {
        self.fields
            .iter()
            .find(|(n, _)| name.matches(n))
            .map(|(_, v)| v)
    }

    /// Returns every value with the given name, in insertion order.
    pub fn get_all<'a, N: AsHeaderName>(&'a self, name: N) -> GetAll<'a, N> {
        GetAll {
            iter: self.fields.iter(),
            name,
        }
    }

    /// Returns `true` if any entry has the given name.
    #[inline]
    pub fn contains_key(&self, name: impl AsHeaderName) -> bool {
        self.fields.iter().any(|(n, _)| name.matches(n))
    }

    /// Remove every entry with the given name, returning the first value.
    pub fn remove(&mut self, name: impl AsHeaderName) -> Option<HeaderValue> {
        let mut removed = None;
        self.fields.retain(|(n, v)| {
            if name.matches(n) {
                if removed.is_none() {
                    removed = Some(v.clone());
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Iterate entries in insertion order.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            iter: self.fields.iter(),
        }
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}

// ===== Iterators =====

/// Iterator over map entries.
#[derive(Debug)]
pub struct Iter<'a> {
    iter: std::slice::Iter<'a, (HeaderName, HeaderValue)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a HeaderName, &'a HeaderValue);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(n, v)| (n, v))
    }
}

/// Iterator over values sharing a name, returned by [`HeaderMap::get_all`].
#[derive(Debug)]
pub struct GetAll<'a, N> {
    iter: std::slice::Iter<'a, (HeaderName, HeaderValue)>,
    name: N,
}

impl<'a, N: AsHeaderName> Iterator for GetAll<'a, N> {
    type Item = &'a HeaderValue;

    fn next(&mut self) -> Option<Self::Item> {
        for (n, v) in self.iter.by_ref() {
            if self.name.matches(n) {
                return Some(v);
            }
        }
        None
    }
}

// ===== Name Parameters =====

/// Types usable as a lookup key in [`HeaderMap`].
pub trait AsHeaderName {
    fn matches(&self, name: &HeaderName) -> bool;
}

impl AsHeaderName for &HeaderName {
    #[inline]
    fn matches(&self, name: &HeaderName) -> bool {
        *self == name
    }
}

impl AsHeaderName for HeaderName {
    #[inline]
    fn matches(&self, name: &HeaderName) -> bool {
        self == name
    }
}

impl AsHeaderName for &str {
    #[inline]
    fn matches(&self, name: &HeaderName) -> bool {
        name.matches(self)
    }
}

/// Types usable as an entry key in [`HeaderMap`].
pub trait IntoHeaderName {
    fn into_header_name(self) -> HeaderName;
}

impl IntoHeaderName for HeaderName {
    #[inline]
    fn into_header_name(self) -> HeaderName {
        self
    }
}

impl IntoHeaderName for &HeaderName {
    #[inline]
    fn into_header_name(self) -> HeaderName {
        self.clone()
    }
}

impl IntoHeaderName for &'static str {
    /// # Panics
    ///
    /// Panics if the name is not a valid header token.
    #[inline]
    fn into_header_name(self) -> HeaderName {
        HeaderName::from_bytes(bytes::Bytes::from_static(self.as_bytes()))
            .expect("invalid static header name")
    }
}
