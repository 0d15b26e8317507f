use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::headers::MediaRange;
use crate::http::Method;

/// The criteria of a route, any of which may be absent.
///
/// Two routes are indistinguishable iff all their criteria are equal;
/// router mutations (`remove`, `enable`, `disable`) address routes by
/// that equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub(crate) path: Option<PathSpec>,
    pub(crate) method: Option<Method>,
    pub(crate) consumes: Option<MediaRange>,
    pub(crate) produces: Option<MediaRange>,
    pub(crate) language: Option<String>,
    pub(crate) queries: QueryRules,
}

impl Route {
    /// Start an empty route.
    #[inline]
    pub fn new() -> Route {
        Route::default()
    }

    /// Set the path criterion.
    ///
    /// A path containing `{` parameters becomes a pattern, anything else
    /// an exact match.
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern or parameter constraint.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(match path.contains('{') {
            true => PathSpec::Pattern {
                pattern: PathPattern::parse(path).expect("invalid path pattern"),
                trailing_slash: false,
            },
            false => PathSpec::Exact {
                path: path.to_owned(),
                trailing_slash: false,
            },
        });
        self
    }

    /// Make the path criterion also match the trailing-slash form.
    ///
    /// # Panics
    ///
    /// Panics when no path criterion is set.
    pub fn trailing_slash(mut self) -> Self {
        match &mut self.path {
            Some(PathSpec::Exact { trailing_slash, .. })
            | Some(PathSpec::Pattern { trailing_slash, .. }) => *trailing_slash = true,
            None => panic!("trailing_slash requires a path"),
        }
        self
    }

    /// Set the method criterion.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the content-type criterion, matched against the request
    /// `Content-Type`.
    ///
    /// # Panics
    ///
    /// Panics on a malformed media range.
    pub fn consumes(mut self, range: &str) -> Self {
        self.consumes = Some(MediaRange::parse(range).expect("invalid media range"));
        self
    }

    /// Set the produced media type, matched against the request `Accept`.
    ///
    /// # Panics
    ///
    /// Panics on a malformed media range.
    pub fn produces(mut self, range: &str) -> Self {
        self.produces = Some(MediaRange::parse(range).expect("invalid media range"));
        self
    }

    /// Set the accepted language criterion, `*` matching anything.
    pub fn language(mut self, tag: &str) -> Self {
        self.language = Some(tag.to_ascii_lowercase());
        self
    }

    /// Add a query parameter criterion.
    ///
    /// All query criteria of a route must match at least one value of
    /// the named parameter.
    pub fn query(mut self, name: &str, matcher: QueryMatcher) -> Self {
        self.queries.insert(name.to_owned(), matcher);
        self
    }

    /// Returns the path criterion.
    #[inline]
    pub fn path_spec(&self) -> Option<&PathSpec> {
        self.path.as_ref()
    }

    /// Returns the method criterion.
    #[inline]
    pub fn method_spec(&self) -> Option<Method> {
        self.method
    }
}

/// Query parameter criteria, keyed by parameter name.
pub type QueryRules = BTreeMap<String, QueryMatcher>;

// ===== Path =====

/// Path criterion of a route.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSpec {
    /// Exact string match on the normalised path.
    Exact { path: String, trailing_slash: bool },
    /// Parameterised template match.
    Pattern {
        pattern: PathPattern,
        trailing_slash: bool,
    },
}

/// A parameterised path template, e.g.
/// `/users/{id}/orders/{order:[0-9]+}`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param {
        name: String,
        constraint: Option<Regex>,
    },
}

impl PathPattern {
    /// Parse a template. Parameters are `{name}` or `{name:regex}`.
    pub fn parse(raw: &str) -> Result<PathPattern, String> {
        let mut segments = Vec::new();
        for part in raw.split('/').filter(|p| !p.is_empty()) {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => {
                    let (name, constraint) = match inner.split_once(':') {
                        Some((name, pattern)) => {
                            let anchored = format!("^(?:{pattern})$");
                            let regex = Regex::new(&anchored)
                                .map_err(|err| format!("invalid constraint: {err}"))?;
                            (name, Some(regex))
                        }
                        None => (inner, None),
                    };
                    if name.is_empty() {
                        return Err("empty parameter name".to_owned());
                    }
                    Segment::Param {
                        name: name.to_owned(),
                        constraint,
                    }
                }
                None => {
                    if part.contains('}') {
                        return Err(format!("stray brace in segment: {part}"));
                    }
                    Segment::Literal(part.to_owned())
                }
            };
            segments.push(segment);
        }
        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    /// Returns the template as given.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a normalised path, extracting parameter values.
    pub fn captures(&self, path: &str, trailing_slash: bool) -> Option<Vec<(String, String)>> {
        let path = match trailing_slash {
            true if path != "/" => path.strip_suffix('/').unwrap_or(path),
            _ => path,
        };
        let mut params = Vec::new();
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param { name, constraint } => {
                    if let Some(constraint) = constraint {
                        if !constraint.is_match(part) {
                            return None;
                        }
                    }
                    params.push((name.clone(), part.to_owned()));
                }
            }
        }
        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }

    /// Specificity order used to sort pattern children best first.
    ///
    /// Walking segments pairwise: a literal beats a parameter, a
    /// constrained parameter beats an unconstrained one. A template with
    /// more segments left is the more specific. Full ties keep
    /// declaration order (the sort is stable).
    pub(crate) fn cmp_specificity(&self, other: &PathPattern) -> Ordering {
        let mut a = self.segments.iter();
        let mut b = other.segments.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (Some(x), Some(y)) => match (segment_rank(x), segment_rank(y)) {
                    (rx, ry) if rx == ry => continue,
                    // the higher ranked segment sorts first
                    (rx, ry) => return ry.cmp(&rx),
                },
            }
        }
    }
}

/// Higher ranks are more specific.
fn segment_rank(segment: &Segment) -> u8 {
    match segment {
        Segment::Literal(_) => 2,
        Segment::Param {
            constraint: Some(_),
            ..
        } => 1,
        Segment::Param {
            constraint: None, ..
        } => 0,
    }
}

impl PartialEq for PathPattern {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

// ===== Query matchers =====

/// Matcher applied to the values of one query parameter.
#[derive(Debug, Clone)]
pub enum QueryMatcher {
    /// The parameter must be present.
    Exists,
    /// Some value must equal the given string.
    Exact(String),
    /// Some value must match the given pattern.
    Pattern(String, Regex),
}

impl QueryMatcher {
    /// Matcher requiring presence.
    #[inline]
    pub fn exists() -> QueryMatcher {
        QueryMatcher::Exists
    }

    /// Matcher requiring an exact value.
    #[inline]
    pub fn exact(value: impl Into<String>) -> QueryMatcher {
        QueryMatcher::Exact(value.into())
    }

    /// Matcher requiring a value matching the anchored pattern.
    pub fn pattern(pattern: &str) -> Result<QueryMatcher, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(QueryMatcher::Pattern(pattern.to_owned(), regex))
    }

    /// Apply to one parameter value.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            QueryMatcher::Exists => true,
            QueryMatcher::Exact(expected) => expected == value,
            QueryMatcher::Pattern(_, regex) => regex.is_match(value),
        }
    }
}

impl PartialEq for QueryMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueryMatcher::Exists, QueryMatcher::Exists) => true,
            (QueryMatcher::Exact(a), QueryMatcher::Exact(b)) => a == b,
            (QueryMatcher::Pattern(a, _), QueryMatcher::Pattern(b, _)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_captures() {
        let pattern = PathPattern::parse("/users/{id}/orders/{order:[0-9]+}").unwrap();
        assert_eq!(
            pattern.captures("/users/jane/orders/42", false),
            Some(vec![
                ("id".to_owned(), "jane".to_owned()),
                ("order".to_owned(), "42".to_owned()),
            ])
        );
        // constraint violation
        assert_eq!(pattern.captures("/users/jane/orders/many", false), None);
        // length mismatch
        assert_eq!(pattern.captures("/users/jane/orders", false), None);
        assert_eq!(pattern.captures("/users/jane/orders/42/x", false), None);
    }

    #[test]
    fn pattern_trailing_slash() {
        let pattern = PathPattern::parse("/files/{name}").unwrap();
        assert!(pattern.captures("/files/a/", false).is_none());
        assert!(pattern.captures("/files/a/", true).is_some());
    }

    #[test]
    fn pattern_specificity() {
        use std::cmp::Ordering;
        let literal = PathPattern::parse("/a/b").unwrap();
        let constrained = PathPattern::parse("/a/{x:[0-9]+}").unwrap();
        let open = PathPattern::parse("/a/{x}").unwrap();
        let longer = PathPattern::parse("/a/{x}/c").unwrap();

        assert_eq!(literal.cmp_specificity(&constrained), Ordering::Less);
        assert_eq!(constrained.cmp_specificity(&open), Ordering::Less);
        assert_eq!(open.cmp_specificity(&literal), Ordering::Greater);
        // a longer template is more specific than a prefix of it
        assert_eq!(longer.cmp_specificity(&open), Ordering::Less);
    }

    #[test]
    fn route_identity() {
        let a = Route::new().path("/x").method(Method::GET);
        let b = Route::new().path("/x").method(Method::GET);
        let c = Route::new().path("/x").method(Method::POST);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let with_query = Route::new()
            .path("/x")
            .query("debug", QueryMatcher::exact("1"));
        assert_ne!(a, with_query);
    }

    #[test]
    fn query_matchers() {
        assert!(QueryMatcher::exists().matches("anything"));
        assert!(QueryMatcher::exact("1").matches("1"));
        assert!(!QueryMatcher::exact("1").matches("2"));
        let pattern = QueryMatcher::pattern("[a-z]+").unwrap();
        assert!(pattern.matches("abc"));
        assert!(!pattern.matches("abc1"));
    }
}
