use super::error::HeaderError;
use super::{HeaderValue, parse_qvalue};

/// A language range from `Accept-Language` or a route criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRange {
    tag: String,
    q: u16,
}

/// How a configured language tag relates to a requested one.
///
/// `en-US` matches `en-US` exactly, the broader `en` matches it as a
/// prefix, `*` matches anything. Exact wins over prefix wins over
/// wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LanguageMatch {
    Wildcard,
    Prefix,
    Exact,
}

impl LanguageRange {
    /// Create a range with full quality.
    pub fn new(tag: impl Into<String>) -> LanguageRange {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            q: 1000,
        }
    }

    /// Returns the lowercased tag.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Quality factor in permille, `0..=1000`.
    #[inline]
    pub fn q(&self) -> u16 {
        self.q
    }

    /// Relate a configured tag to this requested range.
    pub fn match_tag(&self, configured: &str) -> Option<LanguageMatch> {
        let configured = configured.to_ascii_lowercase();
        if configured == "*" || self.tag == "*" {
            return Some(LanguageMatch::Wildcard);
        }
        if configured == self.tag {
            return Some(LanguageMatch::Exact);
        }
        // a broader configured tag covers a more specific request
        if self.tag.starts_with(&configured)
            && self.tag.as_bytes().get(configured.len()) == Some(&b'-')
        {
            return Some(LanguageMatch::Prefix);
        }
        None
    }
}

/// Decoded `Accept-Language` header: language ranges in preference order.
#[derive(Debug, Clone)]
pub struct AcceptLanguage {
    ranges: Vec<LanguageRange>,
}

impl AcceptLanguage {
    /// The wildcard list, used when the request carries no
    /// `Accept-Language`.
    pub fn any() -> AcceptLanguage {
        Self {
            ranges: vec![LanguageRange::new("*")],
        }
    }

    /// Parse and order every `Accept-Language` value of a request.
    pub fn from_values<'a>(
        values: impl Iterator<Item = &'a HeaderValue>,
    ) -> Result<AcceptLanguage, HeaderError> {
        let mut ranges = Vec::new();
        for value in values {
            let raw = value.to_str().ok_or(HeaderError::Codec("accept-language"))?;
            for part in raw.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let (tag, q) = match part.split_once(';') {
                    Some((tag, params)) => {
                        let q = params
                            .trim()
                            .strip_prefix("q=")
                            .and_then(parse_qvalue)
                            .ok_or(HeaderError::Codec("accept-language quality"))?;
                        (tag, q)
                    }
                    None => (part, 1000),
                };
                let tag = tag.trim();
                if tag.is_empty() {
                    return Err(HeaderError::Codec("accept-language"));
                }
                ranges.push(LanguageRange {
                    tag: tag.to_ascii_lowercase(),
                    q,
                });
            }
        }
        if ranges.is_empty() {
            return Ok(Self::any());
        }
        ranges.sort_by(|a, b| b.q.cmp(&a.q));
        Ok(Self { ranges })
    }

    /// Ranges in preference order, best first.
    #[inline]
    pub fn ranges(&self) -> &[LanguageRange] {
        &self.ranges
    }
}

impl Default for AcceptLanguage {
    #[inline]
    fn default() -> Self {
        Self::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        let value = HeaderValue::from_static("fr;q=0.8, en-US, de;q=0.1");
        let langs = AcceptLanguage::from_values(std::iter::once(&value)).unwrap();
        let tags: Vec<&str> = langs.ranges().iter().map(|r| r.tag()).collect();
        assert_eq!(tags, ["en-us", "fr", "de"]);
    }

    #[test]
    fn match_precedence() {
        let range = LanguageRange::new("en-US");
        assert_eq!(range.match_tag("en-US"), Some(LanguageMatch::Exact));
        assert_eq!(range.match_tag("en"), Some(LanguageMatch::Prefix));
        assert_eq!(range.match_tag("*"), Some(LanguageMatch::Wildcard));
        assert_eq!(range.match_tag("fr"), None);
        assert!(LanguageMatch::Exact > LanguageMatch::Prefix);
        assert!(LanguageMatch::Prefix > LanguageMatch::Wildcard);
    }
}
