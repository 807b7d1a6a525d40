// SPDX-License-Identifier: MPL-2.0

pub mod connection;
pub mod error;
pub mod opts;
pub mod retry;
pub mod state;
pub mod transport;

pub use connection::Connection;
pub use error::ClientError;
pub use opts::ConnectOptions;
pub use retry::{Backoff, Reconnector};
pub use state::ConnectionState;
pub use transport::{TcpTransport, Transport, TransportError};
