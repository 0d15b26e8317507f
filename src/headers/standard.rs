//! Constants for well known header names, in canonical casing.
use super::HeaderName;

macro_rules! standard {
    (
        $(
            $(#[$doc:meta])*
            $id:ident = $value:literal;
        )*
    ) => {
        $(
            $(#[$doc])*
            pub const $id: HeaderName = HeaderName::from_static($value);
        )*
    };
}

standard! {
    /// `Accept`, media ranges acceptable for the response.
    ACCEPT = "Accept";
    /// `Accept-Language`, language ranges acceptable for the response.
    ACCEPT_LANGUAGE = "Accept-Language";
    /// `Allow`, methods supported by the target resource.
    ALLOW = "Allow";
    /// `Cache-Control`, caching directives.
    CACHE_CONTROL = "Cache-Control";
    /// `Connection`, connection-level options such as `close`.
    CONNECTION = "Connection";
    /// `Content-Length`, message body size in bytes.
    CONTENT_LENGTH = "Content-Length";
    /// `Content-Type`, media type of the message body.
    CONTENT_TYPE = "Content-Type";
    /// `Date`, origination timestamp of the message.
    DATE = "Date";
    /// `Expect`, request expectations, notably `100-continue`.
    EXPECT = "Expect";
    /// `Host`, authority of the request target.
    HOST = "Host";
    /// `Sec-WebSocket-Accept`, handshake proof derived from the key.
    SEC_WEBSOCKET_ACCEPT = "Sec-WebSocket-Accept";
    /// `Sec-WebSocket-Key`, nonce offered by the client handshake.
    SEC_WEBSOCKET_KEY = "Sec-WebSocket-Key";
    /// `Sec-WebSocket-Protocol`, offered or selected subprotocols.
    SEC_WEBSOCKET_PROTOCOL = "Sec-WebSocket-Protocol";
    /// `Sec-WebSocket-Version`, protocol version, only `13` is supported.
    SEC_WEBSOCKET_VERSION = "Sec-WebSocket-Version";
    /// `Server`, software identity of the origin.
    SERVER = "Server";
    /// `TE`, transfer codings the client is willing to accept, notably
    /// `trailers`.
    TE = "TE";
    /// `Trailer`, names of the fields present in the chunked trailer
    /// section.
    TRAILER = "Trailer";
    /// `Transfer-Encoding`, applied transfer codings.
    TRANSFER_ENCODING = "Transfer-Encoding";
    /// `Upgrade`, protocols the sender wishes to switch to.
    UPGRADE = "Upgrade";
}
