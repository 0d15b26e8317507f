//! Per connection exchange engine.
//!
//! The engine is a per connection state machine handling one logical
//! exchange at a time with a FIFO of pipelined successors: request heads
//! are parsed in arrival order, handlers may complete out of order, and
//! responses are serialised on the wire in arrival order.
//!
//! Every operation touching connection state runs on this task; handler
//! futures are polled here, and off-task completions reschedule it
//! through the body channel wakers.
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::watch;
use tokio::time::{Instant, Sleep};

use super::error::{ConnectionError, ProtoError, TimeoutKind};
use super::parser::{Reqline, parse_header, parse_reqline};
use super::proto::{self, ExchangeContext, HeadSpec, MAX_HEADERS, write_continue, write_head};
use crate::ServerConfig;
use crate::body::error::BodyError;
use crate::body::handle::SendHandle;
use crate::body::{Body, BodyCoder, Codec, Incoming, OutBody};
use crate::common::ParseResult;
use crate::headers::standard::{CONTENT_TYPE, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_PROTOCOL};
use crate::headers::{HeaderMap, HeaderValue};
use crate::http::response::{EndCause, Finalizer};
use crate::http::{Request, Response, StatusCode};
use crate::log::emit;
use crate::service::HttpService;
use crate::ws;
use crate::ws::handshake::{self, HandshakeError};

const DEFAULT_BUFFER_CAP: usize = 1024;
const READ_CHUNK: usize = 4096;
/// Request head cap, reqline and fields combined.
const MAX_HEAD_SIZE: usize = 16 * 1024;
/// In-flight pipelined exchanges per connection.
const MAX_PIPELINE: usize = 32;
/// Stop feeding the write buffer from the body above this level.
const WRITE_HIGH_WATER: usize = 64 * 1024;
/// Unconsumed request body tolerated before the connection is closed
/// instead of drained.
const DRAIN_CAP: u64 = 64 * 1024;

/// What the connection does after the HTTP drive loop returns.
enum Next {
    Close,
    Upgrade(AcceptedUpgrade),
}

enum TimerOutcome {
    /// Nothing fired, wakers are registered.
    Idle,
    /// State changed, re-run the multiplexer.
    Progress,
    /// The connection is done.
    Terminal(Result<Next, ConnectionError>),
}

struct AcceptedUpgrade {
    handler: ws::WsHandlerFn,
    subprotocol: Option<String>,
}

/// One pipelined exchange.
struct Exchange<F> {
    ctx: ExchangeContext,
    deadline: Option<Instant>,
    finalizers: Vec<Finalizer>,
    phase: ExchangePhase<F>,
}

enum ExchangePhase<F> {
    /// The handler is running.
    Service(Pin<Box<F>>),
    /// The handshake failed, the fallback handler is running.
    Fallback(Pin<Box<dyn Future<Output = Response<OutBody>> + Send>>),
    /// Completed, buffered until predecessors drain.
    Ready(Option<Box<Response<OutBody>>>),
}

/// Head-of-line write progress.
enum WriteState {
    Idle,
    Streaming {
        body: OutBody,
        encoder: BodyCoder,
        trailers: Option<HeaderMap>,
        finalizers: Vec<Finalizer>,
        keep_alive: bool,
        body_done: bool,
    },
}

/// Read side progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    /// Parsing the next request head.
    Head,
    /// Relaying the current request body.
    Body,
    /// No further reads.
    Closed,
}

pub struct Connection<IO, S: HttpService> {
    io: IO,
    service: Arc<S>,
    config: Arc<ServerConfig>,
    shutdown: Option<watch::Receiver<bool>>,

    read_buffer: BytesMut,
    write_buffer: BytesMut,

    // ===== read side =====
    reading: Reading,
    eof: bool,
    reqline: Option<Reqline>,
    header_map: HeaderMap,
    decoder: BodyCoder,
    body_tx: SendHandle,
    continue_pending: bool,
    drained: u64,
    /// The current body belongs to a close-bound request, no further
    /// heads follow it.
    body_then_close: bool,
    /// An upgrade candidate is in flight, later heads stay unparsed.
    upgrade_gate: bool,

    // ===== exchanges =====
    exchanges: VecDeque<Exchange<S::Future>>,
    write: WriteState,
    /// Handshake accepted, switch protocols once the 101 flushes.
    upgrade_ready: Option<AcceptedUpgrade>,
    /// Close after the current pipeline drains.
    closing: bool,
    force_close: bool,

    // ===== timers =====
    keep_alive_sleep: Option<Pin<Box<Sleep>>>,
    request_sleep: Option<Pin<Box<Sleep>>>,
    write_sleep: Option<Pin<Box<Sleep>>>,
}

impl<IO, S> Connection<IO, S>
where
    IO: AsyncRead + AsyncWrite + Unpin,
    S: HttpService,
{
    pub fn new(io: IO, service: Arc<S>, config: Arc<ServerConfig>) -> Self {
        Self {
            io,
            service,
            config,
            shutdown: None,
            read_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_CAP),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_CAP),
            reading: Reading::Head,
            eof: false,
            reqline: None,
            header_map: HeaderMap::with_capacity(16),
            decoder: BodyCoder::empty(),
            body_tx: SendHandle::new(),
            continue_pending: false,
            drained: 0,
            body_then_close: false,
            upgrade_gate: false,
            exchanges: VecDeque::new(),
            write: WriteState::Idle,
            upgrade_ready: None,
            closing: false,
            force_close: false,
            keep_alive_sleep: None,
            request_sleep: None,
            write_sleep: None,
        }
    }

    /// Observe the server's graceful drain signal.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Drive the connection to completion.
    pub async fn run(mut self) {
        let mut shutdown = self.shutdown.take();
        loop {
            let step = match &mut shutdown {
                Some(rx) => {
                    tokio::select! {
                        step = std::future::poll_fn(|cx| self.poll_step(cx)) => step,
                        changed = rx.changed() => {
                            self.force_close = true;
                            if changed.is_err() {
                                shutdown = None;
                            }
                            continue;
                        }
                    }
                }
                None => std::future::poll_fn(|cx| self.poll_step(cx)).await,
            };

            match step {
                Ok(Next::Close) => {
                    emit!(debug, "connection closed");
                    break;
                }
                Ok(Next::Upgrade(accepted)) => {
                    emit!(debug, "connection upgraded to websocket");
                    let AcceptedUpgrade {
                        handler,
                        subprotocol,
                    } = accepted;
                    let result = ws::session::run(
                        &mut self.io,
                        &mut self.read_buffer,
                        handler,
                        subprotocol,
                        self.config.max_frame_size,
                    )
                    .await;
                    if let Err(err) = result {
                        emit!(warn, "websocket session ended: {err}");
                    }
                    break;
                }
                Err(err) => {
                    emit!(error, "connection error: {err}");
                    break;
                }
            }
        }
        self.cancel_all();
    }

    /// Cancel every in-flight exchange, firing finalizers exactly once.
    fn cancel_all(&mut self) {
        if let WriteState::Streaming { finalizers, .. } =
            std::mem::replace(&mut self.write, WriteState::Idle)
        {
            for finalizer in finalizers {
                finalizer(EndCause::Cancelled);
            }
        }
        for mut exchange in std::mem::take(&mut self.exchanges) {
            for finalizer in exchange.finalizers.drain(..) {
                finalizer(EndCause::Cancelled);
            }
        }
        self.body_tx
            .fail(io::Error::from(io::ErrorKind::ConnectionAborted));
    }

    // ===== the multiplexer =====

    fn poll_step(&mut self, cx: &mut Context) -> Poll<Result<Next, ConnectionError>> {
        loop {
            let mut progressed = false;

            match self.poll_writes(cx) {
                Poll::Ready(Ok(p)) => progressed |= p,
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => {}
            }

            if self.upgrade_ready.is_some()
                && matches!(self.write, WriteState::Idle)
                && self.write_buffer.is_empty()
            {
                let accepted = self.upgrade_ready.take().unwrap();
                return Poll::Ready(Ok(Next::Upgrade(accepted)));
            }

            progressed |= self.poll_services(cx);
            progressed |= self.prepare_front();

            match self.poll_reading(cx) {
                Poll::Ready(Ok(p)) => progressed |= p,
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => {}
            }

            if self.is_done() {
                return Poll::Ready(Ok(Next::Close));
            }

            if !progressed {
                match self.poll_timers(cx) {
                    TimerOutcome::Idle => return Poll::Pending,
                    TimerOutcome::Progress => continue,
                    TimerOutcome::Terminal(outcome) => return Poll::Ready(outcome),
                }
            }
        }
    }

    fn is_done(&self) -> bool {
        let write_idle =
            matches!(self.write, WriteState::Idle) && self.write_buffer.is_empty();
        if !write_idle || !self.exchanges.is_empty() || self.upgrade_ready.is_some() {
            return false;
        }
        if self.closing || self.reading == Reading::Closed {
            return true;
        }
        // a force-closed idle connection stops waiting for the next head
        if self.force_close && self.reqline.is_none() && self.read_buffer.is_empty() {
            return true;
        }
        self.eof && self.reqline.is_none() && self.read_buffer.is_empty()
    }

    // ===== write side =====

    fn poll_writes(&mut self, cx: &mut Context) -> Poll<Result<bool, ConnectionError>> {
        let mut progressed = self.flush_buffer(cx)?;

        if matches!(self.write, WriteState::Streaming { .. }) {
            let mut state = std::mem::replace(&mut self.write, WriteState::Idle);
            match self.stream_body(cx, &mut state) {
                Ok(p) => progressed |= p,
                Err(err) => {
                    // the head may already be on the wire, the
                    // connection is unrecoverable
                    if let WriteState::Streaming { finalizers, .. } = state {
                        for finalizer in finalizers {
                            finalizer(EndCause::Failed);
                        }
                    }
                    return Poll::Ready(Err(ConnectionError::Proto(ProtoError::ResponseBody(
                        err,
                    ))));
                }
            }

            progressed |= self.flush_buffer(cx)?;

            let done = matches!(state, WriteState::Streaming { body_done: true, .. })
                && self.write_buffer.is_empty();
            self.write = state;
            if done {
                progressed = true;
                self.complete_front();
            }
        }

        if progressed {
            Poll::Ready(Ok(true))
        } else {
            Poll::Pending
        }
    }

    /// Pull body frames into the write buffer up to the high-water mark.
    fn stream_body(&mut self, cx: &mut Context, state: &mut WriteState) -> Result<bool, BodyError> {
        let WriteState::Streaming {
            body,
            encoder,
            trailers,
            body_done,
            ..
        } = state
        else {
            return Ok(false);
        };

        let mut progressed = false;
        while !*body_done && self.write_buffer.len() < WRITE_HIGH_WATER {
            match Pin::new(&mut *body).poll_data(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    progressed = true;
                    match frame.into_data() {
                        Ok(data) => encoder.encode(&data, &mut self.write_buffer)?,
                        Err(frame) => {
                            // late trailer frames join the declared set
                            if let (Ok(late), Some(trailers)) =
                                (frame.into_trailers(), trailers.as_mut())
                            {
                                for (name, value) in &late {
                                    trailers.append(name, value.clone());
                                }
                            }
                        }
                    }
                }
                Poll::Ready(Some(Err(err))) => return Err(err),
                Poll::Ready(None) => {
                    progressed = true;
                    *body_done = true;
                    encoder.finish(&mut self.write_buffer, trailers.as_ref())?;
                }
                Poll::Pending => break,
            }
        }
        Ok(progressed)
    }

    /// Push buffered bytes to the socket.
    fn flush_buffer(&mut self, cx: &mut Context) -> Result<bool, ConnectionError> {
        let mut progressed = false;
        while !self.write_buffer.is_empty() {
            match Pin::new(&mut self.io).poll_write(cx, &self.write_buffer) {
                Poll::Ready(Ok(0)) => {
                    return Err(ConnectionError::Io(io::ErrorKind::WriteZero.into()));
                }
                Poll::Ready(Ok(n)) => {
                    self.write_buffer.advance(n);
                    self.write_sleep = None;
                    progressed = true;
                }
                Poll::Ready(Err(err)) => return Err(ConnectionError::Io(err)),
                Poll::Pending => break,
            }
        }
        if self.write_buffer.is_empty() {
            self.write_sleep = None;
        }
        Ok(progressed)
    }

    /// The front exchange's tail byte flushed.
    fn complete_front(&mut self) {
        let WriteState::Streaming {
            finalizers,
            keep_alive,
            ..
        } = std::mem::replace(&mut self.write, WriteState::Idle)
        else {
            return;
        };

        for finalizer in finalizers {
            finalizer(EndCause::Flushed);
        }
        self.exchanges.pop_front();
        self.request_sleep = None;

        if !keep_alive && self.upgrade_ready.is_none() {
            self.closing = true;
            self.reading = Reading::Closed;
            return;
        }

        // the popped exchange may still own the streaming request body
        if self.exchanges.is_empty() && self.reading == Reading::Body && self.body_tx.is_attached()
        {
            // the application kept the body beyond its exchange, the
            // connection cannot be reused
            self.body_tx
                .fail(io::Error::from(io::ErrorKind::ConnectionAborted));
            self.reading = Reading::Closed;
            self.closing = true;
        }
    }

    // ===== handler side =====

    fn poll_services(&mut self, cx: &mut Context) -> bool {
        let mut progressed = false;
        for exchange in self.exchanges.iter_mut() {
            match &mut exchange.phase {
                ExchangePhase::Service(future) => match future.as_mut().poll(cx) {
                    Poll::Ready(Ok(response)) => {
                        progressed = true;
                        exchange.phase = ExchangePhase::Ready(Some(Box::new(response)));
                    }
                    Poll::Ready(Err(err)) => {
                        progressed = true;
                        let err: crate::BoxError = err.into();
                        emit!(error, "handler error: {err}");
                        exchange.phase =
                            ExchangePhase::Ready(Some(Box::new(internal_error_response())));
                    }
                    Poll::Pending => {}
                },
                ExchangePhase::Fallback(future) => match future.as_mut().poll(cx) {
                    Poll::Ready(response) => {
                        progressed = true;
                        exchange.phase = ExchangePhase::Ready(Some(Box::new(response)));
                    }
                    Poll::Pending => {}
                },
                ExchangePhase::Ready(_) => {}
            }
        }
        progressed
    }

    /// Turn the completed front exchange into wire output.
    fn prepare_front(&mut self) -> bool {
        if !matches!(self.write, WriteState::Idle) || self.closing {
            return false;
        }
        let Some(exchange) = self.exchanges.front_mut() else {
            return false;
        };
        let ExchangePhase::Ready(response) = &mut exchange.phase else {
            return false;
        };
        let Some(response) = response.take() else {
            return false;
        };

        let (mut parts, body) = response.into_parts();
        let mut finalizers = std::mem::take(&mut exchange.finalizers);
        finalizers.append(&mut parts.finalizers);

        // ===== upgrade intercept =====

        let intent = parts
            .extensions
            .remove::<ws::UpgradeIntent>()
            .and_then(|intent| intent.take());
        if let Some(intent) = intent {
            return self.handshake(intent, finalizers);
        }

        // a reset with an unwritten head becomes 204 No Content
        if parts.extensions.remove::<crate::http::Reset>().is_some() {
            parts.status = StatusCode::NO_CONTENT;
        }

        // ===== response head =====

        let allow_body = !exchange.ctx.head_request && !parts.status.is_bodyless();
        let is_sse = body.is_sse();
        if is_sse {
            parts.headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/event-stream;charset=utf-8"),
            );
        }
        let user_server = proto::strip_engine_headers(&mut parts.headers);

        let (coding, encoder, body, body_done) = if !allow_body {
            // suppress framing for HEAD and 1xx/204/304, drop the body
            (None, BodyCoder::empty(), OutBody::empty(), true)
        } else if is_sse {
            (Some(Codec::Chunked), BodyCoder::chunked(), body, false)
        } else {
            match body.size_hint() {
                (lo, Some(hi)) if lo == hi => (
                    Some(Codec::ContentLength(hi)),
                    BodyCoder::fixed(hi),
                    body,
                    hi == 0,
                ),
                _ => (Some(Codec::Chunked), BodyCoder::chunked(), body, false),
            }
        };

        let chunked = matches!(coding, Some(Codec::Chunked));
        let trailers = (chunked && exchange.ctx.te_trailers && !parts.trailers.is_empty())
            .then(|| std::mem::take(&mut parts.trailers));
        let trailer_names = trailers.as_ref().map(|trailers| {
            let mut names = String::new();
            for (name, _) in trailers {
                if !names.is_empty() {
                    names.push_str(", ");
                }
                names.push_str(name.as_str());
            }
            names
        });

        let keep_alive = exchange.ctx.keep_alive && !self.force_close;

        write_head(
            &mut self.write_buffer,
            HeadSpec {
                status: parts.status,
                headers: &parts.headers,
                coding,
                connection_close: !keep_alive,
                trailer_names: trailer_names.as_deref(),
                server: match user_server {
                    true => None,
                    false => self.config.server.as_deref(),
                },
            },
        );

        self.write = WriteState::Streaming {
            body,
            encoder,
            trailers,
            finalizers,
            keep_alive,
            body_done,
        };
        true
    }

    /// Validate the opening request against the completed upgrade intent.
    fn handshake(&mut self, intent: ws::IntentInner, finalizers: Vec<Finalizer>) -> bool {
        let exchange = self.exchanges.front_mut().expect("front exchange");

        let result = (|| {
            if !self.config.ws_enabled {
                return Err(HandshakeError::Disabled);
            }
            let Some(upgrade) = exchange.ctx.upgrade.as_ref() else {
                // not an upgrade request at all
                return Err(HandshakeError::MethodNotGet);
            };
            if !upgrade.is_get {
                return Err(HandshakeError::MethodNotGet);
            }
            if !upgrade.version_13 {
                return Err(HandshakeError::UnsupportedVersion);
            }
            let key = upgrade.key.as_ref().ok_or(HandshakeError::InvalidKey)?;
            let accept = handshake::derive_accept(key.as_bytes())?;

            let server_protocols = match intent.protocols.is_empty() {
                true => &self.config.ws_subprotocols,
                false => &intent.protocols,
            };
            let subprotocol =
                handshake::select_subprotocol(server_protocols, &upgrade.offered_protocols);
            if intent.require_protocol && subprotocol.is_none() {
                return Err(HandshakeError::NoProtocol);
            }
            Ok((accept, subprotocol))
        })();

        match result {
            Ok((accept, subprotocol)) => {
                emit!(debug, "websocket handshake accepted");
                let mut headers = HeaderMap::with_capacity(4);
                headers.append("Upgrade", HeaderValue::from_static("websocket"));
                headers.append("Connection", HeaderValue::from_static("Upgrade"));
                headers.append(
                    SEC_WEBSOCKET_ACCEPT,
                    HeaderValue::from_string(accept).expect("base64 is a valid value"),
                );
                if let Some(subprotocol) = &subprotocol {
                    if let Ok(value) = HeaderValue::from_string(subprotocol.clone()) {
                        headers.append(SEC_WEBSOCKET_PROTOCOL, value);
                    }
                }

                self.write_buffer.extend_from_slice(b"HTTP/1.1 ");
                self.write_buffer
                    .extend_from_slice(StatusCode::SWITCHING_PROTOCOLS.as_str().as_bytes());
                self.write_buffer.extend_from_slice(b"\r\n");
                for (name, value) in &headers {
                    self.write_buffer.extend_from_slice(name.as_bytes());
                    self.write_buffer.extend_from_slice(b": ");
                    self.write_buffer.extend_from_slice(value.as_bytes());
                    self.write_buffer.extend_from_slice(b"\r\n");
                }
                self.write_buffer.extend_from_slice(b"\r\n");

                self.write = WriteState::Streaming {
                    body: OutBody::empty(),
                    encoder: BodyCoder::empty(),
                    trailers: None,
                    finalizers,
                    keep_alive: false,
                    body_done: true,
                };
                self.upgrade_ready = Some(AcceptedUpgrade {
                    handler: intent.handler,
                    subprotocol,
                });
                self.reading = Reading::Closed;
            }
            Err(err) => {
                emit!(warn, "websocket handshake failed: {err}");
                // the connection continues as plain HTTP
                self.upgrade_gate = false;
                match (intent.fallback, exchange.ctx.upgrade.take()) {
                    (Some(fallback), Some(upgrade)) => {
                        // re-dispatch the opening request as a plain
                        // HTTP exchange
                        let request =
                            Request::from_parts(upgrade.head.into_parts(), Incoming::empty());
                        exchange.finalizers = finalizers;
                        exchange.phase = ExchangePhase::Fallback(fallback(request));
                    }
                    _ => {
                        let mut response = Response::new(OutBody::full(format!(
                            "websocket handshake failed: {err}"
                        )));
                        *response.status_mut() = match err {
                            HandshakeError::UnsupportedVersion => StatusCode::UPGRADE_REQUIRED,
                            _ => StatusCode::BAD_REQUEST,
                        };
                        response
                            .headers_mut()
                            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                        exchange.finalizers = finalizers;
                        exchange.phase = ExchangePhase::Ready(Some(Box::new(response)));
                    }
                }
            }
        }
        true
    }

    // ===== read side =====

    fn poll_reading(&mut self, cx: &mut Context) -> Poll<Result<bool, ConnectionError>> {
        let mut progressed = false;
        loop {
            match self.reading {
                Reading::Closed => break,
                Reading::Head => {
                    if self.upgrade_gate
                        || self.closing
                        || self.exchanges.len() >= MAX_PIPELINE
                        || (self.force_close && self.reqline.is_none())
                    {
                        break;
                    }
                    match self.poll_head(cx) {
                        Poll::Ready(Ok(true)) => progressed = true,
                        Poll::Ready(Ok(false)) => break,
                        Poll::Ready(Err(err)) => {
                            // best-effort error exchange, then close
                            emit!(warn, "rejecting request: {err}");
                            self.emit_protocol_error(&err);
                            progressed = true;
                            break;
                        }
                        Poll::Pending => break,
                    }
                }
                Reading::Body => match self.poll_body(cx) {
                    Poll::Ready(Ok(true)) => progressed = true,
                    Poll::Ready(Ok(false)) => break,
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending => break,
                },
            }
        }
        if progressed {
            Poll::Ready(Ok(true))
        } else {
            Poll::Pending
        }
    }

    /// Parse the next request head and dispatch its handler.
    fn poll_head(&mut self, cx: &mut Context) -> Poll<Result<bool, ConnectionError>> {
        if self.reqline.is_none() {
            loop {
                match parse_reqline(&mut self.read_buffer) {
                    ParseResult::Ok(reqline) => {
                        self.reqline = Some(reqline);
                        break;
                    }
                    ParseResult::Err(err) => return Poll::Ready(Err(err.into())),
                    ParseResult::Pending => {
                        if self.read_buffer.len() > MAX_HEAD_SIZE {
                            return Poll::Ready(Err(ProtoError::HeadTooLarge.into()));
                        }
                        match self.poll_read_io(cx) {
                            Poll::Ready(Ok(0)) => {
                                self.eof = true;
                                if self.read_buffer.is_empty() {
                                    self.reading = Reading::Closed;
                                    return Poll::Ready(Ok(true));
                                }
                                return Poll::Ready(Err(ConnectionError::Io(
                                    io::ErrorKind::ConnectionAborted.into(),
                                )));
                            }
                            Poll::Ready(Ok(_)) => {}
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err.into())),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                }
            }
        }

        loop {
            match parse_header(&mut self.read_buffer) {
                ParseResult::Ok(Some(field)) => {
                    proto::insert_header(&mut self.header_map, field.name, field.value)?;
                }
                ParseResult::Ok(None) => break,
                ParseResult::Err(err) => return Poll::Ready(Err(err.into())),
                ParseResult::Pending => {
                    if self.read_buffer.len() > MAX_HEAD_SIZE
                        || self.header_map.len() >= MAX_HEADERS
                    {
                        return Poll::Ready(Err(ProtoError::HeadTooLarge.into()));
                    }
                    match self.poll_read_io(cx) {
                        Poll::Ready(Ok(0)) => {
                            self.eof = true;
                            return Poll::Ready(Err(ConnectionError::Io(
                                io::ErrorKind::ConnectionAborted.into(),
                            )));
                        }
                        Poll::Ready(Ok(_)) => {}
                        Poll::Ready(Err(err)) => return Poll::Ready(Err(err.into())),
                        Poll::Pending => return Poll::Pending,
                    }
                }
            }
        }

        // ===== dispatch =====

        let reqline = self.reqline.take().expect("checked above");
        let headers = std::mem::take(&mut self.header_map);

        let uri = proto::build_uri(&reqline, &headers)?;
        let ctx = ExchangeContext::new(&reqline, &uri, &headers);
        self.decoder = BodyCoder::from_headers(&headers)?;

        let body = self.decoder.build_body(&mut self.read_buffer, &mut self.body_tx);
        self.continue_pending = ctx.expect_continue && self.decoder.has_remaining();

        let parts = crate::http::request::Parts {
            method: reqline.method,
            uri,
            version: reqline.version,
            headers,
            extensions: Default::default(),
        };
        let request = Request::from_parts(parts, body);

        let future = self.service.call(request);
        let deadline = (self.config.request_timeout_ms > 0).then(|| {
            Instant::now() + Duration::from_millis(self.config.request_timeout_ms)
        });
        if ctx.upgrade.is_some() {
            self.upgrade_gate = true;
        }
        let keep_alive = ctx.keep_alive;
        self.exchanges.push_back(Exchange {
            ctx,
            deadline,
            finalizers: Vec::new(),
            phase: ExchangePhase::Service(Box::pin(future)),
        });
        if self.decoder.has_remaining() {
            self.reading = Reading::Body;
            self.body_then_close = !keep_alive;
        } else if !keep_alive {
            // no further requests on a close-bound connection
            self.reading = Reading::Closed;
        }
        self.keep_alive_sleep = None;
        Poll::Ready(Ok(true))
    }

    /// Relay the current request body on demand.
    fn poll_body(&mut self, cx: &mut Context) -> Poll<Result<bool, ConnectionError>> {
        let mut progressed = false;
        loop {
            let attached = self.body_tx.is_attached();
            if attached && !self.body_tx.wants(cx) {
                // no demand, stop reading from the socket
                break;
            }

            if attached && self.continue_pending && self.exchanges.len() <= 1 {
                // interim response before the body is first demanded
                write_continue(&mut self.write_buffer);
                self.continue_pending = false;
                progressed = true;
            }

            match self.decoder.decode(&mut self.read_buffer) {
                Poll::Ready(Some(Ok(chunk))) => {
                    progressed = true;
                    if attached {
                        self.body_tx.push(chunk.freeze());
                    } else {
                        self.drained += chunk.len() as u64;
                        if self.drained > DRAIN_CAP {
                            // too much to discard, drop the connection
                            // after the in-flight responses
                            self.reading = Reading::Closed;
                            self.closing = true;
                            break;
                        }
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    self.body_tx
                        .fail(io::Error::new(io::ErrorKind::InvalidData, "malformed body"));
                    return Poll::Ready(Err(err.into()));
                }
                Poll::Ready(None) => {
                    progressed = true;
                    self.body_tx.finish();
                    self.drained = 0;
                    if self.reading == Reading::Body {
                        self.reading = match self.body_then_close {
                            true => Reading::Closed,
                            false => Reading::Head,
                        };
                    }
                    self.body_then_close = false;
                    break;
                }
                Poll::Pending => match self.poll_read_io(cx) {
                    Poll::Ready(Ok(0)) => {
                        self.eof = true;
                        self.body_tx
                            .fail(io::Error::from(io::ErrorKind::ConnectionAborted));
                        return Poll::Ready(Err(ConnectionError::Io(
                            io::ErrorKind::ConnectionAborted.into(),
                        )));
                    }
                    Poll::Ready(Ok(_)) => progressed = true,
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err.into())),
                    Poll::Pending => break,
                },
            }
        }
        if progressed {
            Poll::Ready(Ok(true))
        } else {
            Poll::Pending
        }
    }

    fn poll_read_io(&mut self, cx: &mut Context) -> Poll<io::Result<usize>> {
        self.read_buffer.reserve(READ_CHUNK);
        let spare = self.read_buffer.spare_capacity_mut();
        let mut buf = ReadBuf::uninit(spare);
        match Pin::new(&mut self.io).poll_read(cx, &mut buf) {
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len();
                // SAFETY: poll_read initialized `n` bytes of the spare
                // capacity
                unsafe { self.read_buffer.set_len(self.read_buffer.len() + n) };
                Poll::Ready(Ok(n))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Queue a protocol error response and stop reading.
    fn emit_protocol_error(&mut self, err: &ConnectionError) {
        self.reading = Reading::Closed;
        self.reqline = None;
        self.header_map.clear();

        let status = match err {
            ConnectionError::Proto(ProtoError::HeadTooLarge) => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            ConnectionError::Proto(ProtoError::TooManyHeaders) => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            ConnectionError::Body(BodyError::UnknownCodings) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::BAD_REQUEST,
        };

        let mut response = Response::new(OutBody::empty());
        *response.status_mut() = status;

        self.exchanges.push_back(Exchange {
            ctx: ExchangeContext {
                version: crate::http::Version::HTTP_11,
                keep_alive: false,
                head_request: false,
                te_trailers: false,
                expect_continue: false,
                upgrade: None,
            },
            deadline: None,
            finalizers: Vec::new(),
            phase: ExchangePhase::Ready(Some(Box::new(response))),
        });
    }

    // ===== timers =====

    /// Poll the configured timeouts.
    fn poll_timers(&mut self, cx: &mut Context) -> TimerOutcome {
        use std::future::Future as _;

        // keep-alive: armed while idle between exchanges
        let idle = self.exchanges.is_empty()
            && self.reqline.is_none()
            && self.reading == Reading::Head
            && self.read_buffer.is_empty();
        if idle && self.config.keep_alive_timeout_ms > 0 {
            let sleep = self.keep_alive_sleep.get_or_insert_with(|| {
                Box::pin(tokio::time::sleep(Duration::from_millis(
                    self.config.keep_alive_timeout_ms,
                )))
            });
            if sleep.as_mut().poll(cx).is_ready() {
                emit!(debug, "keep-alive timeout");
                return TimerOutcome::Terminal(Ok(Next::Close));
            }
        } else {
            self.keep_alive_sleep = None;
        }

        // request: armed for the front exchange
        match self.exchanges.front().and_then(|e| e.deadline) {
            Some(deadline) => {
                let stale = self
                    .request_sleep
                    .as_ref()
                    .is_none_or(|sleep| sleep.deadline() != deadline);
                if stale {
                    self.request_sleep = Some(Box::pin(tokio::time::sleep_until(deadline)));
                }
                let sleep = self.request_sleep.as_mut().unwrap();
                if sleep.as_mut().poll(cx).is_ready() {
                    return self.request_timed_out();
                }
            }
            None => self.request_sleep = None,
        }

        // write idle: armed while the socket refuses bytes
        if !self.write_buffer.is_empty() && self.config.write_idle_timeout_ms > 0 {
            let sleep = self.write_sleep.get_or_insert_with(|| {
                Box::pin(tokio::time::sleep(Duration::from_millis(
                    self.config.write_idle_timeout_ms,
                )))
            });
            if sleep.as_mut().poll(cx).is_ready() {
                return TimerOutcome::Terminal(Err(ConnectionError::Timeout(
                    TimeoutKind::WriteIdle,
                )));
            }
        }

        TimerOutcome::Idle
    }

    /// The front exchange overran the request timeout.
    fn request_timed_out(&mut self) -> TimerOutcome {
        if !matches!(self.write, WriteState::Idle) {
            // head already on the wire, nothing clean left to do
            return TimerOutcome::Terminal(Err(ConnectionError::Timeout(TimeoutKind::Request)));
        }
        emit!(warn, "request timed out");
        let exchange = self.exchanges.front_mut().expect("deadline implies front");
        let mut response = Response::new(OutBody::empty());
        *response.status_mut() = StatusCode::REQUEST_TIMEOUT;
        exchange.ctx.keep_alive = false;
        exchange.deadline = None;
        exchange.phase = ExchangePhase::Ready(Some(Box::new(response)));
        self.request_sleep = None;
        // not terminal: the write path emits the 408 and closes
        TimerOutcome::Progress
    }
}

fn internal_error_response() -> Response<OutBody> {
    let mut response = Response::new(OutBody::full("internal server error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

impl<IO, S: HttpService> std::fmt::Debug for Connection<IO, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
