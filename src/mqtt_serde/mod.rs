// SPDX-License-Identifier: MPL-2.0

pub mod control_packet;
pub mod mqttv3;
pub mod mqttv5;
pub mod parser;

pub use parser::stream::PacketStream;
