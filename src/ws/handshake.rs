//! Opening handshake ([RFC6455 Section 4]).
//!
//! [RFC6455 Section 4]: <https://www.rfc-editor.org/rfc/rfc6455.html#section-4>
use base64ct::{Base64, Encoding};
use sha1::{Digest, Sha1};

/// Why an opening request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    /// Upgrades are disabled by configuration.
    Disabled,
    /// The opening request method is not GET.
    MethodNotGet,
    /// `Sec-WebSocket-Version` is missing or not 13.
    UnsupportedVersion,
    /// `Sec-WebSocket-Key` is missing or not a 16 byte nonce.
    InvalidKey,
    /// Subprotocol negotiation is required and found no intersection.
    NoProtocol,
}

impl std::error::Error for HandshakeError {}

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("websocket upgrades are disabled"),
            Self::MethodNotGet => f.write_str("opening request must be GET"),
            Self::UnsupportedVersion => f.write_str("unsupported websocket version"),
            Self::InvalidKey => f.write_str("invalid websocket key"),
            Self::NoProtocol => f.write_str("no acceptable subprotocol"),
        }
    }
}

/// Validate the client key and derive the `Sec-WebSocket-Accept` value.
pub fn derive_accept(key: &[u8]) -> Result<String, HandshakeError> {
    const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

    // the key must be the base64 form of a 16 byte nonce
    let mut nonce = [0u8; 18];
    match Base64::decode(key, &mut nonce) {
        Ok(decoded) if decoded.len() == 16 => {}
        _ => return Err(HandshakeError::InvalidKey),
    }

    let mut sha1 = Sha1::default();
    sha1.update(key);
    sha1.update(WS_GUID);
    Ok(Base64::encode_string(&sha1.finalize()))
}

/// Select a subprotocol, honoring server preference order.
///
/// The first server entry offered by the client wins.
pub fn select_subprotocol(server: &[String], offered: &[String]) -> Option<String> {
    server
        .iter()
        .find(|wanted| offered.iter().any(|o| o.eq_ignore_ascii_case(wanted)))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::{HandshakeError, derive_accept, select_subprotocol};

    #[test]
    fn accept_value() {
        // the RFC6455 sample handshake
        let accept = derive_accept(b"dGhlIHNhbXBsZSBub25jZQ==").unwrap();
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn rejects_bad_key() {
        assert_eq!(derive_accept(b"not base64!!").unwrap_err(), HandshakeError::InvalidKey);
        // valid base64, wrong decoded size
        assert_eq!(derive_accept(b"c2hvcnQ=").unwrap_err(), HandshakeError::InvalidKey);
    }

    #[test]
    fn server_preference_wins() {
        let server = vec!["graphql-ws".to_owned(), "chat".to_owned()];
        let offered = vec!["chat".to_owned(), "graphql-ws".to_owned()];
        assert_eq!(select_subprotocol(&server, &offered).as_deref(), Some("graphql-ws"));
        assert_eq!(select_subprotocol(&server, &[]), None);
        assert_eq!(select_subprotocol(&[], &offered), None);
    }
}
