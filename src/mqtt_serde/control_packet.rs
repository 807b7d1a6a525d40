// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use thiserror::Error;

use crate::mqtt_serde::mqttv3 as v3;
use crate::mqtt_serde::mqttv5 as v5;
use crate::mqtt_serde::parser::{
    encode_variable_byte_integer, packet_type, DecodeError, Decoded,
};

/// Protocol revision spoken on a connection. Decoding is version-aware
/// because the two revisions share packet types but not layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V3,
    V5,
}

impl ProtocolVersion {
    /// The protocol level byte carried in CONNECT.
    pub fn level(self) -> u8 {
        match self {
            ProtocolVersion::V3 => 4,
            ProtocolVersion::V5 => 5,
        }
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = DecodeError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            4 => Ok(ProtocolVersion::V3),
            5 => Ok(ProtocolVersion::V5),
            other => Err(DecodeError::MalformedPacket(format!(
                "unsupported protocol level {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlPacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
    Auth = 15,
}

impl TryFrom<u8> for ControlPacketType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => ControlPacketType::Connect,
            2 => ControlPacketType::ConnAck,
            3 => ControlPacketType::Publish,
            4 => ControlPacketType::PubAck,
            5 => ControlPacketType::PubRec,
            6 => ControlPacketType::PubRel,
            7 => ControlPacketType::PubComp,
            8 => ControlPacketType::Subscribe,
            9 => ControlPacketType::SubAck,
            10 => ControlPacketType::Unsubscribe,
            11 => ControlPacketType::UnsubAck,
            12 => ControlPacketType::PingReq,
            13 => ControlPacketType::PingResp,
            14 => ControlPacketType::Disconnect,
            15 => ControlPacketType::Auth,
            other => {
                return Err(DecodeError::MalformedPacket(format!(
                    "invalid control packet type {other}"
                )))
            }
        })
    }
}

/// Advisory produced by [`PacketCodec::validate`]: the packet is legal on
/// the wire but questionable, e.g. a client id older brokers may reject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MqttWarning(pub String);

/// Wire codec implemented by every control packet struct.
///
/// `to_bytes` derives the fixed header from the variable header and
/// payload lengths, so a packet can never carry an inconsistent
/// remaining-length field.
pub trait PacketCodec {
    fn packet_type(&self) -> ControlPacketType;

    /// Fixed-header flag nibble. Nonzero only for PUBLISH and the three
    /// packet types whose reserved flags are 0b0010.
    fn flags(&self) -> u8 {
        0
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError>;

    fn payload(&self) -> Result<Vec<u8>, DecodeError>;

    fn fixed_header(&self, remaining_length: usize) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = vec![((self.packet_type() as u8) << 4) | (self.flags() & 0x0F)];
        bytes.extend(encode_variable_byte_integer(remaining_length)?);
        Ok(bytes)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let variable_header = self.variable_header()?;
        let payload = self.payload()?;
        let mut bytes = self.fixed_header(variable_header.len() + payload.len())?;
        bytes.extend(variable_header);
        bytes.extend(payload);
        Ok(bytes)
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError>
    where
        Self: Sized;

    /// The packet type the peer must answer with, if any. PUBLISH reports
    /// PUBACK or PUBREC depending on its QoS.
    fn expected_response(&self) -> Option<ControlPacketType> {
        None
    }

    /// Pre-send advisory check. `None` means nothing worth flagging.
    fn validate(&self) -> Option<MqttWarning> {
        None
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(clippy::large_enum_variant)]
pub enum ControlPacket {
    // V5
    Connect5(v5::connect::Connect),
    ConnAck5(v5::connack::ConnAck),
    Publish5(v5::publish::Publish),
    PubAck5(v5::puback::PubAck),
    PubRec5(v5::pubrec::PubRec),
    PubRel5(v5::pubrel::PubRel),
    PubComp5(v5::pubcomp::PubComp),
    Subscribe5(v5::subscribe::Subscribe),
    SubAck5(v5::suback::SubAck),
    Unsubscribe5(v5::unsubscribe::Unsubscribe),
    UnsubAck5(v5::unsuback::UnsubAck),
    PingReq5(v5::pingreq::PingReq),
    PingResp5(v5::pingresp::PingResp),
    Disconnect5(v5::disconnect::Disconnect),
    Auth(v5::auth::Auth),

    // V3
    Connect3(v3::connect::Connect),
    ConnAck3(v3::connack::ConnAck),
    Publish3(v3::publish::Publish),
    PubAck3(v3::puback::PubAck),
    PubRec3(v3::pubrec::PubRec),
    PubRel3(v3::pubrel::PubRel),
    PubComp3(v3::pubcomp::PubComp),
    Subscribe3(v3::subscribe::Subscribe),
    SubAck3(v3::suback::SubAck),
    Unsubscribe3(v3::unsubscribe::Unsubscribe),
    UnsubAck3(v3::unsuback::UnsubAck),
    PingReq3(v3::pingreq::PingReq),
    PingResp3(v3::pingresp::PingResp),
    Disconnect3(v3::disconnect::Disconnect),
}

macro_rules! each_packet {
    ($value:expr, $p:ident => $body:expr) => {
        match $value {
            ControlPacket::Connect5($p) => $body,
            ControlPacket::ConnAck5($p) => $body,
            ControlPacket::Publish5($p) => $body,
            ControlPacket::PubAck5($p) => $body,
            ControlPacket::PubRec5($p) => $body,
            ControlPacket::PubRel5($p) => $body,
            ControlPacket::PubComp5($p) => $body,
            ControlPacket::Subscribe5($p) => $body,
            ControlPacket::SubAck5($p) => $body,
            ControlPacket::Unsubscribe5($p) => $body,
            ControlPacket::UnsubAck5($p) => $body,
            ControlPacket::PingReq5($p) => $body,
            ControlPacket::PingResp5($p) => $body,
            ControlPacket::Disconnect5($p) => $body,
            ControlPacket::Auth($p) => $body,
            ControlPacket::Connect3($p) => $body,
            ControlPacket::ConnAck3($p) => $body,
            ControlPacket::Publish3($p) => $body,
            ControlPacket::PubAck3($p) => $body,
            ControlPacket::PubRec3($p) => $body,
            ControlPacket::PubRel3($p) => $body,
            ControlPacket::PubComp3($p) => $body,
            ControlPacket::Subscribe3($p) => $body,
            ControlPacket::SubAck3($p) => $body,
            ControlPacket::Unsubscribe3($p) => $body,
            ControlPacket::UnsubAck3($p) => $body,
            ControlPacket::PingReq3($p) => $body,
            ControlPacket::PingResp3($p) => $body,
            ControlPacket::Disconnect3($p) => $body,
        }
    };
}

impl ControlPacket {
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        each_packet!(self, p => p.to_bytes())
    }

    pub fn packet_type(&self) -> ControlPacketType {
        each_packet!(self, p => p.packet_type())
    }

    pub fn expected_response(&self) -> Option<ControlPacketType> {
        each_packet!(self, p => p.expected_response())
    }

    pub fn validate(&self) -> Option<MqttWarning> {
        each_packet!(self, p => p.validate())
    }
}

/// Decodes one control packet from the front of `buffer` for the given
/// protocol revision.
pub fn decode_packet(buffer: &[u8], version: ProtocolVersion) -> Result<Decoded, DecodeError> {
    let kind = ControlPacketType::try_from(packet_type(buffer)?)?;
    match version {
        ProtocolVersion::V5 => match kind {
            ControlPacketType::Connect => v5::connect::Connect::from_bytes(buffer),
            ControlPacketType::ConnAck => v5::connack::ConnAck::from_bytes(buffer),
            ControlPacketType::Publish => v5::publish::Publish::from_bytes(buffer),
            ControlPacketType::PubAck => v5::puback::PubAck::from_bytes(buffer),
            ControlPacketType::PubRec => v5::pubrec::PubRec::from_bytes(buffer),
            ControlPacketType::PubRel => v5::pubrel::PubRel::from_bytes(buffer),
            ControlPacketType::PubComp => v5::pubcomp::PubComp::from_bytes(buffer),
            ControlPacketType::Subscribe => v5::subscribe::Subscribe::from_bytes(buffer),
            ControlPacketType::SubAck => v5::suback::SubAck::from_bytes(buffer),
            ControlPacketType::Unsubscribe => v5::unsubscribe::Unsubscribe::from_bytes(buffer),
            ControlPacketType::UnsubAck => v5::unsuback::UnsubAck::from_bytes(buffer),
            ControlPacketType::PingReq => v5::pingreq::PingReq::from_bytes(buffer),
            ControlPacketType::PingResp => v5::pingresp::PingResp::from_bytes(buffer),
            ControlPacketType::Disconnect => v5::disconnect::Disconnect::from_bytes(buffer),
            ControlPacketType::Auth => v5::auth::Auth::from_bytes(buffer),
        },
        ProtocolVersion::V3 => match kind {
            ControlPacketType::Connect => v3::connect::Connect::from_bytes(buffer),
            ControlPacketType::ConnAck => v3::connack::ConnAck::from_bytes(buffer),
            ControlPacketType::Publish => v3::publish::Publish::from_bytes(buffer),
            ControlPacketType::PubAck => v3::puback::PubAck::from_bytes(buffer),
            ControlPacketType::PubRec => v3::pubrec::PubRec::from_bytes(buffer),
            ControlPacketType::PubRel => v3::pubrel::PubRel::from_bytes(buffer),
            ControlPacketType::PubComp => v3::pubcomp::PubComp::from_bytes(buffer),
            ControlPacketType::Subscribe => v3::subscribe::Subscribe::from_bytes(buffer),
            ControlPacketType::SubAck => v3::suback::SubAck::from_bytes(buffer),
            ControlPacketType::Unsubscribe => v3::unsubscribe::Unsubscribe::from_bytes(buffer),
            ControlPacketType::UnsubAck => v3::unsuback::UnsubAck::from_bytes(buffer),
            ControlPacketType::PingReq => v3::pingreq::PingReq::from_bytes(buffer),
            ControlPacketType::PingResp => v3::pingresp::PingResp::from_bytes(buffer),
            ControlPacketType::Disconnect => v3::disconnect::Disconnect::from_bytes(buffer),
            ControlPacketType::Auth => Err(DecodeError::MalformedPacket(
                "AUTH is not defined for protocol level 4".into(),
            )),
        },
    }
}

/// Shared advisory for client identifiers: the 3.1.1 spec only guarantees
/// brokers accept 1..=23 characters of `[0-9a-zA-Z]`.
pub(crate) fn client_id_warning(client_id: &str) -> Option<MqttWarning> {
    if client_id.len() > 23 {
        return Some(MqttWarning(format!(
            "client id is {} bytes; brokers are only required to accept 23",
            client_id.len()
        )));
    }
    if !client_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(MqttWarning(
            "client id contains characters outside [0-9a-zA-Z]".into(),
        ));
    }
    None
}
