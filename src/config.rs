//! Server configuration.

/// Configuration consumed by the HTTP/1.1 engine and the WebSocket layer.
///
/// A timeout value of zero disables that timeout.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Outbound WebSocket payloads larger than this are split into
    /// continuation frames.
    pub max_frame_size: usize,
    /// When `false`, upgrade requests are rejected before the handshake.
    pub ws_enabled: bool,
    /// Subprotocols accepted by the server, in preference order.
    pub ws_subprotocols: Vec<String>,
    /// Idle time allowed between pipelined requests.
    pub keep_alive_timeout_ms: u64,
    /// Time allowed from head receipt to response tail flush.
    pub request_timeout_ms: u64,
    /// Time a single write is allowed to stay blocked on the peer.
    pub write_idle_timeout_ms: u64,
    /// The HTTP/2 path is a separate implementation sharing only the
    /// routing chain and message model; this engine ignores the flag.
    pub http2_enabled: bool,
    /// Value of the `Server` response header, omitted when `None`.
    pub server: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 65_536,
            ws_enabled: true,
            ws_subprotocols: Vec::new(),
            keep_alive_timeout_ms: 0,
            request_timeout_ms: 0,
            write_idle_timeout_ms: 0,
            http2_enabled: false,
            server: None,
        }
    }
}

impl ServerConfig {
    /// Create the default configuration.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame_size(mut self, value: usize) -> Self {
        self.max_frame_size = value;
        self
    }

    pub fn with_ws_enabled(mut self, value: bool) -> Self {
        self.ws_enabled = value;
        self
    }

    pub fn with_ws_subprotocols<I, T>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ws_subprotocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keep_alive_timeout_ms(mut self, value: u64) -> Self {
        self.keep_alive_timeout_ms = value;
        self
    }

    pub fn with_request_timeout_ms(mut self, value: u64) -> Self {
        self.request_timeout_ms = value;
        self
    }

    pub fn with_write_idle_timeout_ms(mut self, value: u64) -> Self {
        self.write_idle_timeout_ms = value;
        self
    }

    pub fn with_http2_enabled(mut self, value: bool) -> Self {
        self.http2_enabled = value;
        self
    }

    pub fn with_server<T: Into<String>>(mut self, value: T) -> Self {
        self.server = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;

    #[test]
    fn defaults() {
        let config = ServerConfig::new();
        assert_eq!(config.max_frame_size, 65_536);
        assert!(config.ws_enabled);
        assert!(config.ws_subprotocols.is_empty());
        assert_eq!(config.keep_alive_timeout_ms, 0);
        assert_eq!(config.request_timeout_ms, 0);
        assert_eq!(config.write_idle_timeout_ms, 0);
        assert!(!config.http2_enabled);
        assert!(config.server.is_none());
    }
}
