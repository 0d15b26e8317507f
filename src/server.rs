//! All in one API to run a HTTP server.
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use crate::ServerConfig;
use crate::h1::Connection;
use crate::log::emit;
use crate::service::HttpService;

/// HTTP/1.1 server: an accept loop spawning one [`Connection`] task per
/// accepted stream.
pub struct Server<L, S> {
    listener: L,
    service: Arc<S>,
    config: Arc<ServerConfig>,
    shutdown: watch::Sender<bool>,
}

impl<L, S> Server<L, S> {
    pub fn new(listener: L, service: S) -> Self {
        Self {
            listener,
            service: Arc::new(service),
            config: Arc::new(ServerConfig::default()),
            shutdown: watch::Sender::new(false),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Handle that triggers a graceful drain: the listener stops
    /// accepting and live connections finish their in-flight exchanges.
    pub fn shutdown_handle(&self) -> Shutdown {
        Shutdown {
            tx: self.shutdown.clone(),
        }
    }
}

impl<L, S> Server<L, S>
where
    L: Listener<Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static>,
    S: HttpService + Send + Sync + 'static,
    S::Future: Send,
{
    /// Accept until the listener fails or a graceful drain is
    /// triggered.
    pub async fn serve(self) -> io::Result<()> {
        let mut closed = self.shutdown.subscribe();
        loop {
            let accepted = tokio::select! {
                accepted = std::future::poll_fn(|cx| self.listener.poll_accept(cx)) => accepted,
                _ = closed.changed() => {
                    emit!(info, "listener draining");
                    return Ok(());
                }
            };
            let (io, _) = match accepted {
                Ok(ok) => ok,
                Err(err) => {
                    emit!(warn, "accept failed: {err}");
                    continue;
                }
            };
            let connection = Connection::new(io, self.service.clone(), self.config.clone())
                .with_shutdown(self.shutdown.subscribe());
            tokio::spawn(connection.run());
        }
    }

    /// Serve until the given future completes, then drain gracefully.
    pub async fn serve_with_shutdown(self, signal: impl Future<Output = ()>) -> io::Result<()> {
        let handle = self.shutdown_handle();
        tokio::select! {
            result = self.serve() => result,
            _ = signal => {
                handle.shutdown();
                Ok(())
            }
        }
    }
}

impl<L, S> std::fmt::Debug for Server<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}

/// Graceful drain trigger, clonable.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Stop accepting and drain live connections.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

// ===== Listener =====

pub trait Listener {
    type Stream;

    type Addr;

    fn poll_accept(&self, cx: &mut Context) -> Poll<io::Result<(Self::Stream, Self::Addr)>>;
}

impl Listener for tokio::net::TcpListener {
    type Stream = tokio::net::TcpStream;

    type Addr = std::net::SocketAddr;

    #[inline]
    fn poll_accept(&self, cx: &mut Context) -> Poll<io::Result<(Self::Stream, Self::Addr)>> {
        tokio::net::TcpListener::poll_accept(self, cx)
    }
}

#[cfg(unix)]
impl Listener for tokio::net::UnixListener {
    type Stream = tokio::net::UnixStream;

    type Addr = tokio::net::unix::SocketAddr;

    #[inline]
    fn poll_accept(&self, cx: &mut Context) -> Poll<io::Result<(Self::Stream, Self::Addr)>> {
        tokio::net::UnixListener::poll_accept(self, cx)
    }
}
