use std::num::NonZeroU16;

/// HTTP [Status Code][rfc].
///
/// [rfc]: <https://datatracker.ietf.org/doc/html/rfc9110#name-status-codes>
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(NonZeroU16);

/// Status code class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl Default for StatusCode {
    #[inline]
    fn default() -> Self {
        Self::OK
    }
}

impl StatusCode {
    /// Returns the status code class.
    #[inline]
    pub const fn kind(&self) -> StatusKind {
        match self.0.get() {
            100..=199 => StatusKind::Informational,
            200..=299 => StatusKind::Success,
            300..=399 => StatusKind::Redirection,
            400..=499 => StatusKind::ClientError,
            _ => StatusKind::ServerError,
        }
    }

    /// Returns `true` if a response with this status never carries a body.
    ///
    /// Covers 1xx, 204 and 304.
    #[inline]
    pub const fn is_bodyless(&self) -> bool {
        matches!(self.0.get(), 100..=199 | 204 | 304)
    }
}

macro_rules! status_codes {
    (
        $(
            $(#[$doc:meta])*
            $int:literal $id:ident $msg:literal;
        )*
    ) => {
        impl StatusCode {
            /// Returns status code value, e.g: `200`.
            #[inline]
            pub const fn status(&self) -> u16 {
                self.0.get()
            }

            /// Returns status code and message as string slice, e.g: `"200 OK"`.
            #[inline]
            pub const fn as_str(&self) -> &'static str {
                match self.0.get() {
                    $(
                        $int => concat!(stringify!($int), " ", $msg),
                    )*
                    // SAFETY: StatusCode value is privately constructed and immutable
                    _ => unsafe { std::hint::unreachable_unchecked() },
                }
            }

            /// Returns status message, e.g: `"OK"`.
            #[inline]
            pub const fn message(&self) -> &'static str {
                match self.0.get() {
                    $(
                        $int => $msg,
                    )*
                    // SAFETY: StatusCode value is privately constructed and immutable
                    _ => unsafe { std::hint::unreachable_unchecked() },
                }
            }
        }

        impl StatusCode {
            $(
                $(#[$doc])*
                pub const $id: Self = Self(NonZeroU16::new($int).unwrap());
            )*
        }
    };
}

status_codes! {
    /// `100`, the initial part of a request has been received and has not
    /// yet been rejected by the server.
    100 CONTINUE "Continue";
    /// `101`, the server is switching to the protocol named by the
    /// `Upgrade` request header.
    101 SWITCHING_PROTOCOLS "Switching Protocols";
    /// `200`, the request succeeded.
    200 OK "OK";
    /// `201`, the request succeeded and a new resource was created.
    201 CREATED "Created";
    /// `202`, the request has been accepted for processing.
    202 ACCEPTED "Accepted";
    /// `204`, there is no content to send for this request.
    204 NO_CONTENT "No Content";
    /// `301`, the target resource has been assigned a new permanent URI.
    301 MOVED_PERMANENTLY "Moved Permanently";
    /// `302`, the target resource resides temporarily under a different URI.
    302 FOUND "Found";
    /// `303`, the client should retrieve the resource at another URI with GET.
    303 SEE_OTHER "See Other";
    /// `304`, the cached response is still valid.
    304 NOT_MODIFIED "Not Modified";
    /// `307`, repeat the request against another URI with the same method.
    307 TEMPORARY_REDIRECT "Temporary Redirect";
    /// `400`, the server cannot process the request due to a client error.
    400 BAD_REQUEST "Bad Request";
    /// `401`, the request lacks valid authentication credentials.
    401 UNAUTHORIZED "Unauthorized";
    /// `403`, the server refuses to authorize the request.
    403 FORBIDDEN "Forbidden";
    /// `404`, the server cannot find the requested resource.
    404 NOT_FOUND "Not Found";
    /// `405`, the method is known but not supported by the target resource.
    405 METHOD_NOT_ALLOWED "Method Not Allowed";
    /// `406`, content negotiation found no acceptable representation.
    406 NOT_ACCEPTABLE "Not Acceptable";
    /// `408`, the server timed out waiting for the request.
    408 REQUEST_TIMEOUT "Request Timeout";
    /// `411`, the server requires a `Content-Length`.
    411 LENGTH_REQUIRED "Length Required";
    /// `413`, the request body is larger than the server accepts.
    413 CONTENT_TOO_LARGE "Content Too Large";
    /// `414`, the request target is longer than the server accepts.
    414 URI_TOO_LONG "URI Too Long";
    /// `415`, the request body media type is not supported.
    415 UNSUPPORTED_MEDIA_TYPE "Unsupported Media Type";
    /// `426`, the server refuses to perform the request using the current
    /// protocol.
    426 UPGRADE_REQUIRED "Upgrade Required";
    /// `431`, the header section is larger than the server accepts.
    431 REQUEST_HEADER_FIELDS_TOO_LARGE "Request Header Fields Too Large";
    /// `500`, the server encountered an unexpected condition.
    500 INTERNAL_SERVER_ERROR "Internal Server Error";
    /// `501`, the server does not support the requested functionality.
    501 NOT_IMPLEMENTED "Not Implemented";
    /// `503`, the server is currently unable to handle the request.
    503 SERVICE_UNAVAILABLE "Service Unavailable";
}

impl std::fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{StatusCode, StatusKind};

    #[test]
    fn kinds() {
        assert_eq!(StatusCode::CONTINUE.kind(), StatusKind::Informational);
        assert_eq!(StatusCode::OK.kind(), StatusKind::Success);
        assert_eq!(StatusCode::FOUND.kind(), StatusKind::Redirection);
        assert_eq!(StatusCode::NOT_FOUND.kind(), StatusKind::ClientError);
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR.kind(), StatusKind::ServerError);
    }

    #[test]
    fn bodyless() {
        assert!(StatusCode::SWITCHING_PROTOCOLS.is_bodyless());
        assert!(StatusCode::NO_CONTENT.is_bodyless());
        assert!(StatusCode::NOT_MODIFIED.is_bodyless());
        assert!(!StatusCode::OK.is_bodyless());
    }

    #[test]
    fn strings() {
        assert_eq!(StatusCode::OK.as_str(), "200 OK");
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED.message(), "Method Not Allowed");
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED.status(), 405);
    }
}
