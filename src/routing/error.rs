//! Well typed resolution errors, carried as HTTP errors.
use crate::body::OutBody;
use crate::headers::standard::{ALLOW, CONTENT_TYPE};
use crate::headers::HeaderValue;
use crate::http::{Method, Response, StatusCode};

/// Why resolution produced no resource.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteError {
    /// No route matched the input.
    NotFound,
    /// A path matched but not with this method; carries the allowed set.
    MethodNotAllowed(Vec<Method>),
    /// No route consumes the request content type; carries the consumed
    /// ranges.
    UnsupportedMediaType(Vec<String>),
    /// Content negotiation found nothing acceptable; carries the
    /// producible representations.
    NotAcceptable(Vec<String>),
    /// The input could not be decoded.
    BadRequest(&'static str),
}

impl RouteError {
    /// The status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Build the error response, taxonomy headers included.
    pub fn into_response(self) -> Response<OutBody> {
        let status = self.status();
        let mut response = Response::new(OutBody::full(status.message()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        if let Self::MethodNotAllowed(allowed) = &self {
            let mut value = String::new();
            for method in allowed {
                if !value.is_empty() {
                    value.push_str(", ");
                }
                value.push_str(method.as_str());
            }
            if let Ok(value) = HeaderValue::from_string(value) {
                response.headers_mut().insert(ALLOW, value);
            }
        }
        response
    }
}

impl std::error::Error for RouteError {}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::MethodNotAllowed(allowed) => write!(f, "method not allowed: {allowed:?}"),
            Self::UnsupportedMediaType(ranges) => {
                write!(f, "unsupported media type, consumes: {ranges:?}")
            }
            Self::NotAcceptable(produced) => write!(f, "not acceptable, produces: {produced:?}"),
            Self::BadRequest(reason) => write!(f, "bad request: {reason}"),
        }
    }
}
