// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBREC, protocol level 5 (spec 3.5): first acknowledgment of the QoS 2
/// handshake. Same compact success form as PUBACK.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PubRec {
    pub packet_id: u16,
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl PubRec {
    pub fn new(packet_id: u16, reason_code: u8, properties: Vec<Property>) -> Self {
        PubRec {
            packet_id,
            reason_code,
            properties,
        }
    }
}

impl PacketCodec for PubRec {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PubRec
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = self.packet_id.to_be_bytes().to_vec();
        if self.reason_code != 0 || !self.properties.is_empty() {
            bytes.push(self.reason_code);
            bytes.extend(encode_properties(&self.properties)?);
        }
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::PubRec)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "PUBREC fixed header flags must be 0".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (packet_id, consumed) = parse_packet_id(buffer, offset)?;
        offset += consumed;

        let (reason_code, properties) = if offset == hdr.total_len {
            (0x00, Vec::new())
        } else {
            let reason_code = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
            offset += 1;
            let properties = if offset < hdr.total_len {
                let (properties, consumed) = parse_properties(buffer, offset)?;
                offset += consumed;
                properties
            } else {
                Vec::new()
            };
            (reason_code, properties)
        };

        if offset != hdr.total_len {
            return Err(DecodeError::MalformedPacket(format!(
                "PUBREC body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::PubRec5(PubRec {
                packet_id,
                reason_code,
                properties,
            }),
            offset,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::PubRel)
    }
}
