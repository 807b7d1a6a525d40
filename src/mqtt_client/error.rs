// SPDX-License-Identifier: MPL-2.0

//! Error types for client operations.
//!
//! [`ClientError`] distinguishes recoverable connection failures from fatal
//! protocol violations so that retry logic can decide whether another
//! connection attempt makes sense.

use std::io;

use crate::mqtt_client::transport::TransportError;
use crate::mqtt_serde::parser::DecodeError;
use crate::mqtt_session::store::SessionError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The peer sent bytes that do not decode as an MQTT packet.
    #[error("malformed packet: {0}")]
    Malformed(#[from] DecodeError),

    /// Structurally valid traffic that violates protocol rules, for example
    /// an unexpected packet type while waiting for CONNACK.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transport could not be established within the configured window.
    #[error("connection attempt timed out")]
    ConnectionTimeout,

    /// Transport-level failure while connecting or during an open session.
    #[error("connection failure: {message}")]
    ConnectionFailure {
        kind: io::ErrorKind,
        message: String,
    },

    /// The broker answered CONNECT with an error reason code.
    #[error("broker rejected connection with reason code {reason_code:#04x}")]
    BrokerRejectedConnection { reason_code: u8 },

    /// CONNECT was written but the acknowledgement could not be read.
    #[error("failed to read CONNACK: {0}")]
    FailedToReadConnAck(String),

    /// All 65535 packet identifiers are leased to in-flight messages.
    #[error("packet identifier space exhausted")]
    PacketIdExhausted,

    /// The outbound queue or a worker task went away.
    #[error("connection queue closed")]
    QueueClosed,

    #[error("not connected")]
    NotConnected,

    /// Operation attempted in a state that does not allow it.
    #[error("invalid state: expected {expected}, was {actual}")]
    InvalidState { expected: String, actual: String },
}

impl ClientError {
    /// True when the failure class is a broken or unreachable transport,
    /// the kind of error another connection attempt can fix.
    pub fn should_reconnect(&self) -> bool {
        match self {
            Self::ConnectionTimeout | Self::QueueClosed | Self::NotConnected => true,
            Self::ConnectionFailure { kind, .. } => matches!(
                kind,
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }

    /// True for the MalformedPacket/ProtocolError class. Retrying after one
    /// of these reproduces the same violation.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::Protocol(_))
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::ConnectionFailure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io_err) => io_err.into(),
            other => Self::ConnectionFailure {
                kind: io::ErrorKind::Other,
                message: other.to_string(),
            },
        }
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::PacketIdExhausted => Self::PacketIdExhausted,
            SessionError::UnsuitablePacket(msg) => Self::Protocol(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        let err: ClientError =
            io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer").into();
        assert!(err.should_reconnect());
        assert!(ClientError::ConnectionTimeout.should_reconnect());
    }

    #[test]
    fn protocol_violations_are_not_retryable() {
        let err = ClientError::Protocol("unexpected SUBACK before CONNACK".into());
        assert!(err.is_protocol_error());
        assert!(!err.should_reconnect());

        let err = ClientError::Malformed(DecodeError::MalformedPacket("bad flags".into()));
        assert!(err.is_protocol_error());
    }

    #[test]
    fn session_exhaustion_maps_to_client_error() {
        let err: ClientError = SessionError::PacketIdExhausted.into();
        assert!(matches!(err, ClientError::PacketIdExhausted));
    }
}
