use super::error::HeaderError;
use super::{HeaderValue, parse_qvalue};

/// Decoded `Content-Type` value.
///
/// The raw form given at parse time is preserved and used on emit, so the
/// value round-trips bit-exact.
#[derive(Debug, Clone)]
pub struct ContentType {
    raw: String,
    kind: String,
    subkind: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    /// Parse a `Content-Type` value (`type/subtype;param=value`).
    pub fn parse(raw: &str) -> Result<ContentType, HeaderError> {
        let mut parts = raw.split(';');
        let essence = parts.next().unwrap_or("").trim();
        let (kind, subkind) = essence
            .split_once('/')
            .ok_or(HeaderError::Codec("content-type"))?;
        if kind.is_empty() || subkind.is_empty() {
            return Err(HeaderError::Codec("content-type"));
        }

        let mut params = Vec::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, value) = part
                .split_once('=')
                .ok_or(HeaderError::Codec("content-type parameter"))?;
            let value = value.trim().trim_matches('"');
            params.push((name.trim().to_ascii_lowercase(), value.to_owned()));
        }

        Ok(Self {
            raw: raw.to_owned(),
            kind: kind.trim().to_ascii_lowercase(),
            subkind: subkind.trim().to_ascii_lowercase(),
            params,
        })
    }

    /// Parse from a header value, rejecting non UTF-8 bytes.
    pub fn from_value(value: &HeaderValue) -> Result<ContentType, HeaderError> {
        let raw = value.to_str().ok_or(HeaderError::Codec("content-type"))?;
        Self::parse(raw)
    }

    /// Returns the lowercased type.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the lowercased subtype.
    #[inline]
    pub fn subkind(&self) -> &str {
        &self.subkind
    }

    /// Returns `type/subtype` in lowercase.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subkind)
    }

    /// Parameters in declaration order, names lowercased.
    #[inline]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Returns the `charset` parameter value.
    pub fn charset(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == "charset")
            .map(|(_, value)| value.as_str())
    }

    /// Returns the raw form given at parse time.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

// ===== Media Range =====

/// A media range (`type/subtype`, possibly wildcarded) with a quality
/// factor, as found in `Accept` and in route criteria.
#[derive(Debug, Clone)]
pub struct MediaRange {
    kind: Option<String>,
    subkind: Option<String>,
    params: Vec<(String, String)>,
    q: u16,
}

impl MediaRange {
    /// The `*/*` range.
    pub fn any() -> MediaRange {
        Self {
            kind: None,
            subkind: None,
            params: Vec::new(),
            q: 1000,
        }
    }

    /// Parse a media range (`type/subtype;param=value;q=0.8`).
    pub fn parse(raw: &str) -> Result<MediaRange, HeaderError> {
        let mut parts = raw.split(';');
        let essence = parts.next().unwrap_or("").trim();
        let (kind, subkind) = essence
            .split_once('/')
            .ok_or(HeaderError::Codec("media range"))?;
        let kind = match kind.trim() {
            "*" => None,
            "" => return Err(HeaderError::Codec("media range")),
            other => Some(other.to_ascii_lowercase()),
        };
        let subkind = match subkind.trim() {
            "*" => None,
            "" => return Err(HeaderError::Codec("media range")),
            other => Some(other.to_ascii_lowercase()),
        };
        if kind.is_none() && subkind.is_some() {
            return Err(HeaderError::Codec("media range"));
        }

        let mut params = Vec::new();
        let mut q = 1000;
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, value) = part
                .split_once('=')
                .ok_or(HeaderError::Codec("media range parameter"))?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"');
            if name == "q" {
                q = parse_qvalue(value).ok_or(HeaderError::Codec("quality value"))?;
            } else {
                params.push((name, value.to_owned()));
            }
        }

        Ok(Self {
            kind,
            subkind,
            params,
            q,
        })
    }

    /// Quality factor in permille, `0..=1000`.
    #[inline]
    pub fn q(&self) -> u16 {
        self.q
    }

    /// Specificity rank: parameterised concrete, concrete, `type/*`, `*/*`.
    pub fn specificity(&self) -> u8 {
        match (&self.kind, &self.subkind) {
            (Some(_), Some(_)) if !self.params.is_empty() => 3,
            (Some(_), Some(_)) => 2,
            (Some(_), None) => 1,
            _ => 0,
        }
    }

    /// Whether the given concrete media type falls within this range.
    ///
    /// Range parameters must be present on the media type with equal
    /// values, the `charset` casing being ignored.
    pub fn matches(&self, content: &ContentType) -> bool {
        if let Some(kind) = &self.kind {
            if kind != content.kind() {
                return false;
            }
            if let Some(subkind) = &self.subkind {
                if subkind != content.subkind() {
                    return false;
                }
            }
        }
        self.params.iter().all(|(name, value)| {
            content
                .params()
                .iter()
                .any(|(n, v)| n == name && v.eq_ignore_ascii_case(value))
        })
    }

    /// Whether another range falls within this range, ignoring parameters.
    ///
    /// Used when matching route produced types against `Accept` ranges.
    pub fn includes(&self, other: &MediaRange) -> bool {
        match (&self.kind, &other.kind) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => {
                if a != b {
                    return false;
                }
                match (&self.subkind, &other.subkind) {
                    (None, _) => true,
                    (Some(_), None) => false,
                    (Some(a), Some(b)) => a == b,
                }
            }
        }
    }

    /// Media range equality disregards the quality factor.
    fn essence_eq(&self, other: &MediaRange) -> bool {
        self.kind == other.kind && self.subkind == other.subkind && self.params == other.params
    }
}

impl PartialEq for MediaRange {
    fn eq(&self, other: &Self) -> bool {
        self.essence_eq(other)
    }
}

impl Eq for MediaRange {}

impl std::fmt::Display for MediaRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = self.kind.as_deref().unwrap_or("*");
        let subkind = self.subkind.as_deref().unwrap_or("*");
        write!(f, "{kind}/{subkind}")?;
        for (name, value) in &self.params {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MediaRange {
    type Err = HeaderError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
