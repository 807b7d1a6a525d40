// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// UNSUBACK, protocol level 5 (spec 3.11). One reason code per filter of
/// the UNSUBSCRIBE it answers.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct UnsubAck {
    pub packet_id: u16,
    pub properties: Vec<Property>,
    pub reason_codes: Vec<u8>,
}

impl UnsubAck {
    pub fn new(packet_id: u16, properties: Vec<Property>, reason_codes: Vec<u8>) -> Self {
        UnsubAck {
            packet_id,
            properties,
            reason_codes,
        }
    }
}

impl PacketCodec for UnsubAck {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::UnsubAck
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = self.packet_id.to_be_bytes().to_vec();
        bytes.extend(encode_properties(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.reason_codes.clone())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::UnsubAck)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "UNSUBACK fixed header flags must be 0".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (packet_id, consumed) = parse_packet_id(buffer, offset)?;
        offset += consumed;

        let (properties, consumed) = parse_properties(buffer, offset)?;
        offset += consumed;

        if offset > hdr.total_len {
            return Err(DecodeError::MalformedPacket(
                "UNSUBACK variable header overruns the declared length".into(),
            ));
        }
        let reason_codes = buffer[offset..hdr.total_len].to_vec();
        if reason_codes.is_empty() {
            return Err(DecodeError::ProtocolError(
                "UNSUBACK carries no reason codes".into(),
            ));
        }

        Ok(Decoded::Packet(
            ControlPacket::UnsubAck5(UnsubAck {
                packet_id,
                properties,
                reason_codes,
            }),
            hdr.total_len,
        ))
    }
}
