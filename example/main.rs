use bytes::Bytes;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::net::TcpListener;

use ostro::BoxError;
use ostro::ServerConfig;
use ostro::body::{Incoming, OutBody, SseEvent};
use ostro::http::{Method, Request, Response};
use ostro::routing::{PathParams, QueryMatcher, Route, WebRouter};
use ostro::server::Server;
use ostro::ws;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let router = WebRouter::new()
        .route(Route::new().path("/").method(Method::GET), index)
        .route(
            Route::new().path("/users/{id:[0-9]+}").method(Method::GET),
            user,
        )
        .route(
            Route::new()
                .path("/search")
                .method(Method::GET)
                .query("q", QueryMatcher::exists()),
            search,
        )
        .route(Route::new().path("/ticks").method(Method::GET), ticks)
        .route(Route::new().path("/ws").method(Method::GET), echo);

    let config = ServerConfig::default()
        .with_server("ostro-example")
        .with_keep_alive_timeout_ms(30_000)
        .with_ws_subprotocols(["echo"]);

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    println!("listening on 0.0.0.0:3000");

    Server::new(listener, router)
        .with_config(config)
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

async fn index(_req: Request<Incoming>) -> Result<Response<OutBody>, BoxError> {
    Ok(Response::new(OutBody::full("hello from ostro\n")))
}

async fn user(req: Request<Incoming>) -> Result<Response<OutBody>, BoxError> {
    let id = req
        .extensions()
        .get::<PathParams>()
        .and_then(|params| params.get("id"))
        .unwrap_or("?")
        .to_owned();
    Ok(Response::new(OutBody::full(format!("user {id}\n"))))
}

async fn search(req: Request<Incoming>) -> Result<Response<OutBody>, BoxError> {
    let query = req.uri().query().unwrap_or("").to_owned();
    Ok(Response::new(OutBody::full(format!("searching: {query}\n"))))
}

async fn ticks(_req: Request<Incoming>) -> Result<Response<OutBody>, BoxError> {
    Ok(Response::new(OutBody::sse(Ticker {
        remaining: 5,
        timer: Box::pin(tokio::time::sleep(Duration::from_secs(1))),
    })))
}

async fn echo(_req: Request<Incoming>) -> Result<Response<OutBody>, BoxError> {
    let response = ws::upgrade(|mut socket: ws::WebSocket| async move {
        let closer = socket.closer();
        let (inbound, outbound) = socket.split();
        let sink = match outbound.messages() {
            Ok(sink) => sink,
            Err(_) => return,
        };
        let mut messages = match inbound.messages() {
            Ok(messages) => messages,
            Err(_) => return,
        };
        while let Some(message) = messages.next().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        closer.close(1000, "bye").await;
    })
    .protocols(["echo"])
    .fallback(|_req| async {
        Response::new(OutBody::full("websocket endpoint, upgrade required\n"))
    })
    .into_response();
    Ok(response)
}

/// Emits one `tick` event per second, five in total.
struct Ticker {
    remaining: u32,
    timer: Pin<Box<tokio::time::Sleep>>,
}

impl futures_core::Stream for Ticker {
    type Item = Result<SseEvent, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        if me.remaining == 0 {
            return Poll::Ready(None);
        }
        std::task::ready!(me.timer.as_mut().poll(cx));
        me.remaining -= 1;
        me.timer = Box::pin(tokio::time::sleep(Duration::from_secs(1)));
        let event = SseEvent::builder()
            .id(me.remaining.to_string())
            .event("tick")
            .data(Bytes::from_static(b"tock"))
            .build();
        Poll::Ready(Some(Ok(event)))
    }
}
