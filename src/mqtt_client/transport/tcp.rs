// SPDX-License-Identifier: MPL-2.0

//! TCP transport.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn set_nodelay(&self, nodelay: bool) -> Result<(), TransportError> {
        self.stream.set_nodelay(nodelay).map_err(TransportError::Io)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(addr: &str) -> Result<Self, TransportError> {
        if addr.is_empty() {
            return Err(TransportError::InvalidAddress("empty address".into()));
        }
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{addr}: {e}")))?;
        Ok(Self { stream })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await.map_err(TransportError::Io)
    }

    fn peer_addr(&self) -> Result<String, TransportError> {
        self.stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .map_err(TransportError::Io)
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        ctx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(ctx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        ctx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(ctx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(ctx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_a_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let accept = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            peer.read_exact(&mut buf).await.unwrap();
            buf
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert!(transport.peer_addr().is_ok());
        transport.write_all(b"ping").await.unwrap();
        transport.flush().await.unwrap();
        assert_eq!(&accept.await.unwrap(), b"ping");
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_address_is_rejected() {
        assert!(matches!(
            TcpTransport::connect("").await,
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn refused_connection_reports_failure() {
        // Port 1 is essentially never listening.
        let result = TcpTransport::connect("127.0.0.1:1").await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }
}
