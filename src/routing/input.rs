use super::error::RouteError;
use crate::headers::standard::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use crate::headers::{Accept, AcceptLanguage, ContentType};
use crate::http::{Method, request};
use crate::uri::{normalize_path, query_pairs};

/// Everything resolution looks at, extracted from a request head.
///
/// The path is normalised (dot-segments collapsed, percent-decoded), the
/// negotiation headers are decoded and ordered up front.
#[derive(Debug, Clone)]
pub struct RouteInput {
    pub method: Method,
    pub path: String,
    pub content_type: Option<ContentType>,
    pub accept: Accept,
    pub accept_language: AcceptLanguage,
    pub query: Vec<(String, String)>,
}

impl RouteInput {
    /// Build an input with defaults for everything but method and path.
    pub fn new(method: Method, path: &str) -> RouteInput {
        Self {
            method,
            path: normalize_path(path),
            content_type: None,
            accept: Accept::any(),
            accept_language: AcceptLanguage::any(),
            query: Vec::new(),
        }
    }

    /// Decode a request head into a resolution input.
    ///
    /// A malformed negotiation header is a [`RouteError::BadRequest`].
    pub fn from_parts(parts: &request::Parts) -> Result<RouteInput, RouteError> {
        let content_type = match parts.headers.get(CONTENT_TYPE) {
            Some(value) => Some(
                ContentType::from_value(value)
                    .map_err(|_| RouteError::BadRequest("invalid content-type"))?,
            ),
            None => None,
        };
        let accept = Accept::from_values(parts.headers.get_all(ACCEPT))
            .map_err(|_| RouteError::BadRequest("invalid accept"))?;
        let accept_language = AcceptLanguage::from_values(parts.headers.get_all(ACCEPT_LANGUAGE))
            .map_err(|_| RouteError::BadRequest("invalid accept-language"))?;

        Ok(Self {
            method: parts.method,
            path: normalize_path(parts.uri.path()),
            content_type,
            accept,
            accept_language,
            query: parts.uri.query().map(query_pairs).unwrap_or_default(),
        })
    }

    /// Replace the query parameters, mostly for tests and manual inputs.
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}
