use bytes::{Bytes, BytesMut};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use super::Connection;
use crate::body::{ChunkedDecoder, Incoming, OutBody, SseEvent};
use crate::http::{Method, Request, Response, StatusCode};
use crate::routing::{QueryMatcher, Route, WebRouter};
use crate::service::{HttpService, from_fn};
use crate::ws;
use crate::{BoxError, ServerConfig};

// ===== harness =====

fn spawn_conn<S>(service: S, config: ServerConfig) -> TestClient
where
    S: HttpService + Send + Sync + 'static,
    S::Future: Send,
{
    let (client, server) = tokio::io::duplex(16 * 1024);
    let connection = Connection::new(server, Arc::new(service), Arc::new(config));
    tokio::spawn(connection.run());
    TestClient {
        io: client,
        buf: Vec::new(),
    }
}

struct TestClient {
    io: DuplexStream,
    buf: Vec<u8>,
}

#[derive(Debug)]
struct RawResponse {
    head: String,
    /// Raw body bytes as framed on the wire.
    body: Vec<u8>,
}

impl RawResponse {
    fn status_line(&self) -> &str {
        self.head.split("\r\n").next().unwrap()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.split("\r\n").skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    /// Decode the chunked body into its payload bytes.
    fn dechunk(&self) -> Vec<u8> {
        let mut buf = BytesMut::from(&self.body[..]);
        let mut decoder = ChunkedDecoder::new();
        let mut out = Vec::new();
        loop {
            match decoder.decode(&mut buf) {
                Poll::Ready(Some(Ok(chunk))) => out.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(err))) => panic!("bad chunked body: {err}"),
                Poll::Ready(None) => return out,
                Poll::Pending => panic!("truncated chunked body"),
            }
        }
    }
}

impl TestClient {
    async fn send(&mut self, bytes: &[u8]) {
        self.io.write_all(bytes).await.unwrap();
    }

    async fn fill(&mut self) -> usize {
        let mut chunk = [0u8; 4096];
        let n = self.io.read(&mut chunk).await.unwrap();
        self.buf.extend_from_slice(&chunk[..n]);
        n
    }

    /// Read one response, leaving pipelined successors buffered.
    async fn response(&mut self) -> RawResponse {
        let head_end = loop {
            if let Some(at) = find(&self.buf, b"\r\n\r\n") {
                break at + 4;
            }
            assert_ne!(self.fill().await, 0, "eof before response head");
        };
        let head = String::from_utf8(self.buf[..head_end].to_vec()).unwrap();
        self.buf.drain(..head_end);

        let response = RawResponse {
            head,
            body: Vec::new(),
        };

        let body = if let Some(value) = response.header("content-length") {
            let len: usize = value.parse().unwrap();
            while self.buf.len() < len {
                assert_ne!(self.fill().await, 0, "eof before response body");
            }
            self.buf.drain(..len).collect()
        } else if response.header("transfer-encoding") == Some("chunked") {
            // consume framing until the decoder reports end of body
            let mut consumed;
            loop {
                let mut probe = BytesMut::from(&self.buf[..]);
                let before = probe.len();
                let mut decoder = ChunkedDecoder::new();
                let done = loop {
                    match decoder.decode(&mut probe) {
                        Poll::Ready(Some(Ok(_))) => {}
                        Poll::Ready(Some(Err(err))) => panic!("bad chunked body: {err}"),
                        Poll::Ready(None) => break true,
                        Poll::Pending => break false,
                    }
                };
                consumed = before - probe.len();
                if done {
                    break;
                }
                assert_ne!(self.fill().await, 0, "eof before chunked body end");
            }
            self.buf.drain(..consumed).collect()
        } else {
            Vec::new()
        };

        RawResponse { body, ..response }
    }

    /// The server must close the stream without further bytes.
    async fn expect_eof(&mut self) {
        assert!(self.buf.is_empty(), "unexpected buffered bytes");
        assert_eq!(self.fill().await, 0, "expected eof");
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Cold stream handing out a fixed chunk sequence.
struct ChunkStream(std::vec::IntoIter<Bytes>);

impl futures_core::Stream for ChunkStream {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().0.next().map(Ok))
    }
}

fn chunk_stream(chunks: &[&'static [u8]]) -> ChunkStream {
    ChunkStream(
        chunks
            .iter()
            .map(|c| Bytes::from_static(c))
            .collect::<Vec<_>>()
            .into_iter(),
    )
}

fn ok_response(body: impl Into<OutBody>) -> Response<OutBody> {
    Response::new(body.into())
}

// ===== scenarios =====

#[tokio::test]
async fn exact_path_get() {
    let router = WebRouter::new().route(
        Route::new().path("/hello").method(Method::GET),
        |_req: Request<Incoming>| async { Ok(ok_response("hi")) },
    );
    let mut client = spawn_conn(router, ServerConfig::default());

    client.send(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(response.header("content-length"), Some("2"));
    assert_eq!(response.body, b"hi");
}

#[tokio::test]
async fn method_not_allowed() {
    let router = WebRouter::new().route(
        Route::new().path("/x").method(Method::GET),
        |_req: Request<Incoming>| async { Ok(ok_response("never")) },
    );
    let mut client = spawn_conn(router, ServerConfig::default());

    client.send(b"POST /x HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(response.status_line(), "HTTP/1.1 405 Method Not Allowed");
    assert_eq!(response.header("allow"), Some("GET"));
}

#[tokio::test]
async fn chunked_streaming_with_trailers() {
    let service = from_fn(|_req: Request<Incoming>| async {
        let mut response = ok_response(OutBody::stream(chunk_stream(&[b"abc", b"de", b"f"])));
        response.trailers_mut().append(
            "X-Sum",
            crate::headers::HeaderValue::from_static("6"),
        );
        response
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client
        .send(b"GET /sum HTTP/1.1\r\nHost: x\r\nTE: trailers\r\nConnection: close\r\n\r\n")
        .await;
    let response = client.response().await;

    assert_eq!(response.header("transfer-encoding"), Some("chunked"));
    assert_eq!(response.header("trailer"), Some("X-Sum"));
    assert_eq!(
        response.body,
        b"3\r\nabc\r\n2\r\nde\r\n1\r\nf\r\n0\r\nX-Sum: 6\r\n\r\n"
    );
    client.expect_eof().await;
}

#[tokio::test]
async fn trailers_dropped_without_te() {
    let service = from_fn(|_req: Request<Incoming>| async {
        let mut response = ok_response(OutBody::stream(chunk_stream(&[b"abc"])));
        response.trailers_mut().append(
            "X-Sum",
            crate::headers::HeaderValue::from_static("3"),
        );
        response
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client.send(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(response.header("trailer"), None);
    assert_eq!(response.body, b"3\r\nabc\r\n0\r\n\r\n");
}

#[tokio::test(start_paused = true)]
async fn pipelined_responses_stay_ordered() {
    let service = from_fn(|req: Request<Incoming>| async move {
        match req.uri().path() {
            "/a" => {
                // completes after /b, must still be written first
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                ok_response("A")
            }
            _ => ok_response("B"),
        }
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client
        .send(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n")
        .await;

    let first = client.response().await;
    assert_eq!(first.body, b"A");
    let second = client.response().await;
    assert_eq!(second.body, b"B");
}

#[tokio::test]
async fn request_body_is_streamed_to_the_handler() {
    let service = from_fn(|req: Request<Incoming>| async move {
        let body = req.into_body().collect().await.unwrap();
        ok_response(OutBody::full(body))
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client
        .send(b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello")
        .await;
    let response = client.response().await;
    assert_eq!(response.body, b"hello");

    // chunked request body on the same connection
    client
        .send(b"POST /echo HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n")
        .await;
    let response = client.response().await;
    assert_eq!(response.body, b"abcde");
}

#[tokio::test]
async fn head_suppresses_body_framing() {
    let service = from_fn(|_req: Request<Incoming>| async { ok_response("payload") });
    let mut client = spawn_conn(service, ServerConfig::default());

    client.send(b"HEAD /x HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(response.header("content-length"), None);
    assert_eq!(response.header("transfer-encoding"), None);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn http10_defaults_to_close() {
    let service = from_fn(|_req: Request<Incoming>| async { ok_response("bye") });
    let mut client = spawn_conn(service, ServerConfig::default());

    client.send(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(response.header("connection"), Some("close"));
    assert_eq!(response.body, b"bye");
    client.expect_eof().await;
}

#[tokio::test]
async fn connection_close_is_honored() {
    let service = from_fn(|_req: Request<Incoming>| async { ok_response("x") });
    let mut client = spawn_conn(service, ServerConfig::default());

    client
        .send(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await;
    let response = client.response().await;
    assert_eq!(response.header("connection"), Some("close"));
    client.expect_eof().await;
}

#[tokio::test]
async fn expect_continue_gets_interim_response() {
    let service = from_fn(|req: Request<Incoming>| async move {
        let body = req.into_body().collect().await.unwrap();
        ok_response(OutBody::full(body))
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client
        .send(b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 2\r\nExpect: 100-continue\r\n\r\n")
        .await;
    let interim = client.response().await;
    assert_eq!(interim.status_line(), "HTTP/1.1 100 Continue");

    client.send(b"ok").await;
    let response = client.response().await;
    assert_eq!(response.body, b"ok");
}

#[tokio::test]
async fn server_header_is_configurable() {
    let service = from_fn(|_req: Request<Incoming>| async { ok_response("x") });
    let config = ServerConfig::default().with_server("ostro-test");
    let mut client = spawn_conn(service, config);

    client.send(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;
    assert_eq!(response.header("server"), Some("ostro-test"));
    assert!(response.header("date").is_some());
}

#[tokio::test]
async fn bad_request_head_is_rejected() {
    let service = from_fn(|_req: Request<Incoming>| async { ok_response("x") });
    let mut client = spawn_conn(service, ServerConfig::default());

    client.send(b"BREW /pot HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;
    assert_eq!(response.status_line(), "HTTP/1.1 400 Bad Request");
    assert_eq!(response.header("connection"), Some("close"));
    client.expect_eof().await;
}

#[tokio::test]
async fn sse_events_on_the_wire() {
    let events = || {
        vec![
            SseEvent::builder().id("1").data("line1\nline2").build(),
            SseEvent::builder().event("tick").data("x").build(),
        ]
    };
    let service = from_fn(move |_req: Request<Incoming>| {
        let events = events();
        async move {
            ok_response(OutBody::sse(ChunkStream2(events.into_iter())))
        }
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client.send(b"GET /events HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(
        response.header("content-type"),
        Some("text/event-stream;charset=utf-8")
    );
    assert_eq!(response.header("transfer-encoding"), Some("chunked"));
    assert_eq!(
        response.dechunk(),
        b"id:1\ndata:line1\r\ndata:line2\r\n\r\nevent:tick\ndata:x\r\n\r\n"
    );
}

/// Cold stream handing out fixed events.
struct ChunkStream2(std::vec::IntoIter<SseEvent>);

impl futures_core::Stream for ChunkStream2 {
    type Item = Result<SseEvent, BoxError>;

    fn poll_next(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().0.next().map(Ok))
    }
}

// ===== websocket =====

fn mask_payload(payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    payload
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i & 3])
        .collect()
}

fn client_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let key = [0xa1, 0xb2, 0xc3, 0xd4];
    let mut out = vec![0x80 | opcode];
    assert!(payload.len() < 126, "test helper supports short frames only");
    out.push(0x80 | payload.len() as u8);
    out.extend_from_slice(&key);
    out.extend_from_slice(&mask_payload(payload, key));
    out
}

/// Parse one unmasked server frame: `(opcode, payload, rest)`.
fn server_frame(bytes: &[u8]) -> (u8, Vec<u8>, Vec<u8>) {
    assert!(bytes.len() >= 2);
    assert_eq!(bytes[0] & 0x80, 0x80, "expected FIN");
    let opcode = bytes[0] & 0x0f;
    let len = (bytes[1] & 0x7f) as usize;
    assert_eq!(bytes[1] & 0x80, 0, "server frames are unmasked");
    assert!(len < 126, "test helper supports short frames only");
    let payload = bytes[2..2 + len].to_vec();
    (opcode, payload, bytes[2 + len..].to_vec())
}

#[tokio::test]
async fn websocket_echo_and_close() {
    let router = WebRouter::new().route(
        Route::new().path("/ws").method(Method::GET),
        |_req: Request<Incoming>| async {
            let response = ws::upgrade(|mut socket: ws::WebSocket| async move {
                let closer = socket.closer();
                let (inbound, outbound) = socket.split();
                let sink = outbound.messages().unwrap();
                let mut messages = inbound.messages().unwrap();
                while let Some(message) = messages.next().await {
                    let text = message.into_text().unwrap();
                    sink.send(ws::Message::text(text)).await.unwrap();
                }
                closer.close(1000, "").await;
            })
            .into_response();
            Ok(response)
        },
    );
    let mut client = spawn_conn(router, ServerConfig::default());

    client
        .send(
            b"GET /ws HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
              Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n",
        )
        .await;

    let response = client.response().await;
    assert_eq!(response.status_line(), "HTTP/1.1 101 Switching Protocols");
    assert_eq!(
        response.header("sec-websocket-accept"),
        Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
    );

    // echo
    client.send(&client_frame(0x1, b"ping")).await;
    while find(&client.buf, b"ping").is_none() {
        assert_ne!(client.fill().await, 0);
    }
    let (opcode, payload, rest) = server_frame(&client.buf);
    assert_eq!(opcode, 0x1);
    assert_eq!(payload, b"ping");
    client.buf = rest;

    // close dance
    client
        .send(&client_frame(0x8, &1000u16.to_be_bytes()))
        .await;
    while client.buf.len() < 4 {
        assert_ne!(client.fill().await, 0, "expected close frame");
    }
    let (opcode, payload, rest) = server_frame(&client.buf);
    assert_eq!(opcode, 0x8);
    assert_eq!(&payload[..2], &1000u16.to_be_bytes());
    client.buf = rest;
    client.expect_eof().await;
}

#[tokio::test]
async fn websocket_handshake_failure_falls_back() {
    let router = WebRouter::new().route(
        Route::new().path("/ws"),
        |_req: Request<Incoming>| async {
            let response = ws::upgrade(|_socket: ws::WebSocket| async {})
                .fallback(|_req| async {
                    let mut response = Response::new(OutBody::full("plain fallback"));
                    *response.status_mut() = StatusCode::OK;
                    response
                })
                .into_response();
            Ok(response)
        },
    );
    let mut client = spawn_conn(router, ServerConfig::default());

    // missing Sec-WebSocket-Key
    client
        .send(
            b"GET /ws HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
              Sec-WebSocket-Version: 13\r\n\r\n",
        )
        .await;
    let response = client.response().await;
    assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(response.body, b"plain fallback");
}

#[tokio::test]
async fn websocket_disabled_without_fallback_is_an_error() {
    let router = WebRouter::new().route(
        Route::new().path("/ws"),
        |_req: Request<Incoming>| async {
            Ok(ws::upgrade(|_socket: ws::WebSocket| async {}).into_response())
        },
    );
    let config = ServerConfig::default().with_ws_enabled(false);
    let mut client = spawn_conn(router, config);

    client
        .send(
            b"GET /ws HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
              Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n",
        )
        .await;
    let response = client.response().await;
    assert_eq!(response.status_line(), "HTTP/1.1 400 Bad Request");
}

#[tokio::test]
async fn websocket_subprotocol_negotiation() {
    let router = WebRouter::new().route(
        Route::new().path("/ws"),
        |_req: Request<Incoming>| async {
            let response = ws::upgrade(|socket: ws::WebSocket| async move {
                assert_eq!(socket.subprotocol(), Some("graphql-ws"));
            })
            .protocols(["graphql-ws", "chat"])
            .require_protocol()
            .into_response();
            Ok(response)
        },
    );
    let mut client = spawn_conn(router, ServerConfig::default());

    client
        .send(
            b"GET /ws HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
              Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\
              Sec-WebSocket-Protocol: chat, graphql-ws\r\n\r\n",
        )
        .await;
    let response = client.response().await;
    assert_eq!(response.status_line(), "HTTP/1.1 101 Switching Protocols");
    // server preference order wins over the client's
    assert_eq!(response.header("sec-websocket-protocol"), Some("graphql-ws"));
}

// ===== routing through the engine =====

#[tokio::test]
async fn query_routes_through_the_engine() {
    let router = WebRouter::new()
        .route(
            Route::new()
                .path("/q")
                .query("mode", QueryMatcher::exact("full")),
            |_req: Request<Incoming>| async { Ok(ok_response("full")) },
        )
        .route(Route::new().path("/q"), |_req: Request<Incoming>| async {
            Ok(ok_response("plain"))
        });
    let mut client = spawn_conn(router, ServerConfig::default());

    client
        .send(b"GET /q?mode=full HTTP/1.1\r\nHost: x\r\n\r\n")
        .await;
    assert_eq!(client.response().await.body, b"full");

    client.send(b"GET /q HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(client.response().await.body, b"plain");
}

#[tokio::test]
async fn reset_becomes_204_before_head_write() {
    let service = from_fn(|_req: Request<Incoming>| async { crate::http::response::reset() });
    let mut client = spawn_conn(service, ServerConfig::default());

    client.send(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let response = client.response().await;

    assert_eq!(response.status_line(), "HTTP/1.1 204 No Content");
    assert_eq!(response.header("content-length"), None);
    assert_eq!(response.header("transfer-encoding"), None);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn finalizer_runs_once_after_flush() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FIRED: AtomicUsize = AtomicUsize::new(0);

    let service = from_fn(|_req: Request<Incoming>| async {
        let mut response = ok_response("done");
        response.on_end(|cause| {
            assert_eq!(cause, crate::http::response::EndCause::Flushed);
            FIRED.fetch_add(1, Ordering::SeqCst);
        });
        response
    });
    let mut client = spawn_conn(service, ServerConfig::default());

    client
        .send(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await;
    let response = client.response().await;
    assert_eq!(response.body, b"done");
    client.expect_eof().await;

    assert_eq!(FIRED.load(Ordering::SeqCst), 1);
}
