//! WebSocket ([RFC6455]).
//!
//! The upgrade is requested by a handler returning the response built by
//! [`upgrade`]; the HTTP/1.1 engine performs the handshake after the
//! exchange completes and hands the connection to the session loop.
//!
//! Only protocol version 13 is supported.
//!
//! [RFC6455]: <https://www.rfc-editor.org/rfc/rfc6455.html>
pub mod frame;
mod mask;
mod utf8;
pub mod handshake;
mod channel;
pub(crate) mod session;

pub mod error;

pub use channel::{
    CloseHandle, FrameSink, Frames, Inbound, Message, MessageKind, MessageSink, Messages,
    Outbound, WebSocket,
};
pub use error::WsError;
pub use frame::{Frame, OpCode};

use std::pin::Pin;
use std::sync::Mutex;

use crate::body::{Incoming, OutBody};
use crate::http::{Request, Response, StatusCode};

pub(crate) type WsHandlerFn =
    Box<dyn FnOnce(WebSocket) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

pub(crate) type FallbackFn = Box<
    dyn FnOnce(Request<Incoming>) -> Pin<Box<dyn Future<Output = Response<OutBody>> + Send>>
        + Send,
>;

/// Builder for a WebSocket upgrade response.
///
/// The returned [`Response`] completes the exchange normally; the engine
/// then validates the opening request and either switches protocols or
/// re-dispatches the request to the fallback.
pub struct Upgrade {
    protocols: Vec<String>,
    require_protocol: bool,
    handler: WsHandlerFn,
    fallback: Option<FallbackFn>,
}

/// Start a WebSocket upgrade with the session handler.
pub fn upgrade<H, Fut>(handler: H) -> Upgrade
where
    H: FnOnce(WebSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Upgrade {
        protocols: Vec::new(),
        require_protocol: false,
        handler: Box::new(move |socket| Box::pin(handler(socket))),
        fallback: None,
    }
}

impl Upgrade {
    /// Subprotocols this endpoint speaks, in server preference order.
    ///
    /// Overrides the configured list for this upgrade.
    pub fn protocols<I, T>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Fail the handshake when no offered subprotocol is acceptable.
    pub fn require_protocol(mut self) -> Self {
        self.require_protocol = true;
        self
    }

    /// Exchange handler the opening request is re-dispatched to when the
    /// handshake fails.
    pub fn fallback<F, Fut>(mut self, fallback: F) -> Self
    where
        F: FnOnce(Request<Incoming>) -> Fut + Send + 'static,
        Fut: Future<Output = Response<OutBody>> + Send + 'static,
    {
        self.fallback = Some(Box::new(move |request| Box::pin(fallback(request))));
        self
    }

    /// Finish into the response completing the exchange.
    pub fn into_response(self) -> Response<OutBody> {
        let mut response = Response::new(OutBody::empty());
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
        response.extensions_mut().insert(UpgradeIntent::new(
            self.protocols,
            self.require_protocol,
            self.handler,
            self.fallback,
        ));
        response
    }
}

impl std::fmt::Debug for Upgrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upgrade")
            .field("protocols", &self.protocols)
            .field("require_protocol", &self.require_protocol)
            .finish_non_exhaustive()
    }
}

// ===== Engine intent =====

/// Upgrade payload carried through response extensions to the engine.
///
/// Extensions require `Sync`, the one-shot handler does not provide it,
/// hence the interior mutex.
pub(crate) struct UpgradeIntent {
    inner: Mutex<Option<IntentInner>>,
}

pub(crate) struct IntentInner {
    pub protocols: Vec<String>,
    pub require_protocol: bool,
    pub handler: WsHandlerFn,
    pub fallback: Option<FallbackFn>,
}

impl UpgradeIntent {
    fn new(
        protocols: Vec<String>,
        require_protocol: bool,
        handler: WsHandlerFn,
        fallback: Option<FallbackFn>,
    ) -> Self {
        Self {
            inner: Mutex::new(Some(IntentInner {
                protocols,
                require_protocol,
                handler,
                fallback,
            })),
        }
    }

    pub(crate) fn take(&self) -> Option<IntentInner> {
        self.inner.lock().unwrap().take()
    }
}

impl std::fmt::Debug for UpgradeIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeIntent").finish_non_exhaustive()
    }
}
