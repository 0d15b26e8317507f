use bytes::BytesMut;

use super::error::ProtoError;
use super::parser::Reqline;
use crate::body::Codec;
use crate::common::ByteStr;
use crate::headers::standard::{
    CONNECTION, CONTENT_LENGTH, DATE, EXPECT, HOST, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_PROTOCOL,
    SEC_WEBSOCKET_VERSION, SERVER, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use crate::headers::{HeaderMap, HeaderValue};
use crate::http::{Method, StatusCode, Version, request};
use crate::uri::{Scheme, Uri};

pub(crate) const MAX_HEADERS: usize = 64;

/// Wire facts of one exchange, computed from the request head and
/// consulted when the response is written.
#[derive(Debug)]
pub(crate) struct ExchangeContext {
    pub version: Version,
    /// Keep the connection open after this exchange.
    pub keep_alive: bool,
    /// HEAD request, the response body is suppressed.
    pub head_request: bool,
    /// The peer negotiated `TE: trailers`.
    pub te_trailers: bool,
    /// The peer expects an interim `100 Continue` before sending its body.
    pub expect_continue: bool,
    /// The request asked for a WebSocket upgrade.
    pub upgrade: Option<UpgradeRequest>,
}

/// Upgrade facts captured from the opening request.
#[derive(Debug)]
pub(crate) struct UpgradeRequest {
    pub is_get: bool,
    pub version_13: bool,
    pub key: Option<HeaderValue>,
    pub offered_protocols: Vec<String>,
    /// Head of the opening request, kept for a fallback re-dispatch when
    /// the handshake fails.
    pub head: StoredHead,
}

/// Request head retained past its dispatch.
#[derive(Debug, Clone)]
pub(crate) struct StoredHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl StoredHead {
    pub(crate) fn into_parts(self) -> request::Parts {
        request::Parts {
            method: self.method,
            uri: self.uri,
            version: self.version,
            headers: self.headers,
            extensions: Default::default(),
        }
    }
}

impl ExchangeContext {
    pub(crate) fn new(reqline: &Reqline, uri: &Uri, headers: &HeaderMap) -> ExchangeContext {
        let mut keep_alive = reqline.version >= Version::HTTP_11;

        let mut upgrade_token = false;
        let mut connection_upgrade = false;
        for value in headers.get_all(CONNECTION) {
            for option in value.as_bytes().split(|&b| b == b',') {
                let option = option.trim_ascii();
                if option.eq_ignore_ascii_case(b"close") {
                    keep_alive = false;
                } else if option.eq_ignore_ascii_case(b"keep-alive")
                    && reqline.version == Version::HTTP_10
                {
                    keep_alive = true;
                } else if option.eq_ignore_ascii_case(b"upgrade") {
                    connection_upgrade = true;
                }
            }
        }
        for value in headers.get_all(UPGRADE) {
            for protocol in value.as_bytes().split(|&b| b == b',') {
                if protocol.trim_ascii().eq_ignore_ascii_case(b"websocket") {
                    upgrade_token = true;
                }
            }
        }

        let te_trailers = headers.get_all(TE).any(|value| {
            value.as_bytes().split(|&b| b == b',').any(|coding| {
                // a TE member may carry parameters, `trailers` does not
                coding.trim_ascii().eq_ignore_ascii_case(b"trailers")
            })
        });

        let expect_continue = headers
            .get(EXPECT)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"));

        let upgrade = (upgrade_token && connection_upgrade).then(|| UpgradeRequest {
            is_get: reqline.method == Method::GET,
            version_13: headers
                .get(SEC_WEBSOCKET_VERSION)
                .is_some_and(|v| v.as_bytes() == b"13"),
            key: headers.get(SEC_WEBSOCKET_KEY).cloned(),
            offered_protocols: headers
                .get_all(SEC_WEBSOCKET_PROTOCOL)
                .filter_map(|v| v.to_str())
                .flat_map(|v| v.split(','))
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty())
                .collect(),
            head: StoredHead {
                method: reqline.method,
                uri: uri.clone(),
                version: reqline.version,
                headers: headers.clone(),
            },
        });

        ExchangeContext {
            version: reqline.version,
            keep_alive,
            head_request: reqline.method == Method::HEAD,
            te_trailers,
            expect_continue,
            upgrade,
        }
    }
}

/// Reconstruct the request target from the origin-form target and `Host`.
pub(crate) fn build_uri(reqline: &Reqline, headers: &HeaderMap) -> Result<Uri, ProtoError> {
    let authority = match headers.get(HOST) {
        Some(host) => host
            .to_str()
            .map(|s| ByteStr::from(s.to_owned()))
            .ok_or(ProtoError::MissingHost)?,
        None if reqline.version == Version::HTTP_10 => ByteStr::new(),
        None => return Err(ProtoError::MissingHost),
    };
    let (path, query) = Uri::split_target(reqline.target.clone());
    Ok(Uri::new(Scheme::Http, authority, path, query))
}

/// Insert a parsed header field, enforcing the field count cap.
pub(crate) fn insert_header(
    map: &mut HeaderMap,
    name: BytesMut,
    value: BytesMut,
) -> Result<(), super::error::ConnectionError> {
    use super::error::ConnectionError;
    use super::parser::ParseError;

    if map.len() >= MAX_HEADERS {
        return Err(ConnectionError::Proto(ProtoError::TooManyHeaders));
    }
    let name = crate::headers::HeaderName::from_bytes(name.freeze())
        .map_err(|_| ConnectionError::Parse(ParseError::InvalidHeaderName))?;
    let value = HeaderValue::from_bytes(value.freeze())
        .map_err(|_| ConnectionError::Parse(ParseError::InvalidHeaderValue))?;
    map.append(name, value);
    Ok(())
}

// ===== Response head =====

/// Everything the head encoder needs besides the user headers.
#[derive(Debug)]
pub(crate) struct HeadSpec<'a> {
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    /// Body framing advertised on the wire, `None` suppresses framing
    /// headers entirely (HEAD, 1xx, 204, 304).
    pub coding: Option<Codec>,
    pub connection_close: bool,
    /// Trailer names announced upfront.
    pub trailer_names: Option<&'a str>,
    pub server: Option<&'a str>,
}

/// Encode a response head.
///
/// Engine-owned headers (`Date`, `Connection`, framing, `Trailer`,
/// `Server`) are written first; `spec.headers` must already be stripped
/// of them.
pub(crate) fn write_head(buf: &mut BytesMut, spec: HeadSpec) {
    buf.extend_from_slice(b"HTTP/1.1 ");
    buf.extend_from_slice(spec.status.as_str().as_bytes());
    buf.extend_from_slice(b"\r\nDate: ");
    buf.extend_from_slice(&crate::http::httpdate_now());
    buf.extend_from_slice(b"\r\n");

    if let Some(server) = spec.server {
        buf.extend_from_slice(b"Server: ");
        buf.extend_from_slice(server.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    if spec.connection_close {
        buf.extend_from_slice(b"Connection: close\r\n");
    }

    match spec.coding {
        Some(Codec::Chunked) => {
            buf.extend_from_slice(b"Transfer-Encoding: chunked\r\n");
        }
        Some(Codec::ContentLength(len)) => {
            buf.extend_from_slice(b"Content-Length: ");
            buf.extend_from_slice(itoa::Buffer::new().format(len).as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        None => {}
    }

    if let Some(names) = spec.trailer_names {
        buf.extend_from_slice(b"Trailer: ");
        buf.extend_from_slice(names.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    for (name, value) in spec.headers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
}

/// Encode the interim `100 Continue` head.
pub(crate) fn write_continue(buf: &mut BytesMut) {
    buf.extend_from_slice(b"HTTP/1.1 100 Continue\r\n\r\n");
}

/// Strip headers the engine owns from a user supplied header map.
///
/// Returns `true` if the user set their own `Server` header, which then
/// takes precedence over the configured one.
pub(crate) fn strip_engine_headers(headers: &mut HeaderMap) -> bool {
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONNECTION);
    headers.remove(DATE);
    headers.remove(TRAILER);
    headers.contains_key(SERVER)
}
