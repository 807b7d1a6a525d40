// SPDX-License-Identifier: MPL-2.0

//! Transport abstraction.
//!
//! A [`Transport`] is an ordered, bidirectional byte stream. The connection
//! layer owns framing, timeouts and keep-alive; a transport only moves
//! bytes. TCP is the shipped implementation; TLS or WebSocket wrappers can
//! implement the same trait externally.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

pub mod tcp;

pub use tcp::TcpTransport;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    /// Dials `addr` (`host:port`) and returns a connected transport.
    async fn connect(addr: &str) -> Result<Self, TransportError>
    where
        Self: Sized;

    /// Gracefully shuts the stream down.
    async fn close(&mut self) -> Result<(), TransportError>;

    fn peer_addr(&self) -> Result<String, TransportError>;
}
