// SPDX-License-Identifier: MPL-2.0

pub mod mqtt_client;
pub mod mqtt_serde;
pub mod mqtt_session;

pub use mqtt_client::connection::Connection;
pub use mqtt_client::error::ClientError;
pub use mqtt_client::opts::ConnectOptions;
pub use mqtt_client::state::ConnectionState;
pub use mqtt_serde::control_packet::{
    ControlPacket, ControlPacketType, PacketCodec, ProtocolVersion,
};
pub use mqtt_serde::parser::stream::PacketStream;
pub use mqtt_serde::parser::{DecodeError, Decoded};
pub use mqtt_session::{ClientSession, SessionState};
