// SPDX-License-Identifier: MPL-2.0

//! Connection lifecycle states.

use crate::mqtt_client::error::ClientError;

/// Lifecycle of a single connection attempt. One value per attempt, owned
/// by the [`crate::mqtt_client::connection::Connection`] and shared with its
/// worker tasks behind a mutex.
#[derive(Debug, Clone, Default)]
pub enum ConnectionState {
    /// Freshly constructed, nothing on the wire yet.
    #[default]
    Initializing,
    /// Transport dial and CONNECT/CONNACK exchange in progress.
    Connecting,
    /// CONNACK accepted, worker loops running.
    Open,
    /// Graceful shutdown requested, DISCONNECT queued.
    Closing,
    /// Terminal. `None` after a clean close, `Some` when the connection was
    /// torn down by a failure while open.
    Closed(Option<ClientError>),
    /// Terminal. The connection never reached `Open`.
    Failed(ClientError),
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Failed(_))
    }

    /// Short name for logging and `InvalidState` errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed(_) => "closed",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
