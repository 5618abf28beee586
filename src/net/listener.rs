//! TCP listener with a connection cap.
//!
//! # Responsibilities
//! - Accept incoming TCP connections for `axum::serve`
//! - Enforce `listener.max_connections` via semaphore
//! - Release the slot when the connection (or its upgraded WebSocket) closes
//!
//! A permit is acquired before `accept`, so once the cap is reached new
//! connections queue in the kernel backlog until a slot frees up.

use axum::serve::Listener;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A TCP listener that never has more than `max_connections` open streams.
#[derive(Debug)]
pub struct BoundedListener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl BoundedListener {
    pub fn new(inner: TcpListener, max_connections: usize) -> Self {
        Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Current free connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

impl Listener for BoundedListener {
    type Io = LimitedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        // Backpressure first, then accept.
        let permit = match self.connection_limit.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Connection semaphore closed, accepting without a limit");
                None
            }
        };

        // Retries and logs accept errors internally.
        let (stream, addr) = Listener::accept(&mut self.inner).await;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        (
            LimitedStream {
                stream,
                _permit: permit,
            },
            addr,
        )
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// An accepted stream holding one connection slot until dropped.
#[derive(Debug)]
pub struct LimitedStream {
    stream: TcpStream,
    _permit: Option<OwnedSemaphorePermit>,
}

impl LimitedStream {
    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.stream.set_nodelay(nodelay)
    }
}

impl AsyncRead for LimitedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for LimitedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn bounded(max_connections: usize) -> BoundedListener {
        let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
        BoundedListener::new(inner, max_connections)
    }

    #[tokio::test]
    async fn test_accept_waits_for_free_slot() {
        let mut listener = bounded(1).await;
        let addr = Listener::local_addr(&listener).unwrap();

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let _c2 = TcpStream::connect(addr).await.unwrap();

        let (first, _) = Listener::accept(&mut listener).await;
        assert_eq!(listener.available_permits(), 0);

        let blocked = timeout(Duration::from_millis(100), Listener::accept(&mut listener)).await;
        assert!(blocked.is_err(), "second connection admitted past the cap");

        drop(first);
        let second = timeout(Duration::from_secs(1), Listener::accept(&mut listener)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_slot_released_on_drop() {
        let mut listener = bounded(2).await;
        let addr = Listener::local_addr(&listener).unwrap();
        assert_eq!(listener.max_connections(), 2);

        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = Listener::accept(&mut listener).await;
        assert!(peer.ip().is_loopback());
        assert_eq!(listener.available_permits(), 1);

        drop(stream);
        assert_eq!(listener.available_permits(), 2);
    }
}
