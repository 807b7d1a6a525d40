// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBREL, protocol level 5 (spec 3.6): second leg of the QoS 2 handshake.
/// Its fixed-header flags are the reserved pattern 0b0010.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PubRel {
    pub packet_id: u16,
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl PubRel {
    pub fn new(packet_id: u16, reason_code: u8, properties: Vec<Property>) -> Self {
        PubRel {
            packet_id,
            reason_code,
            properties,
        }
    }
}

impl PacketCodec for PubRel {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PubRel
    }

    fn flags(&self) -> u8 {
        0x02
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
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::PubRel)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0x02 {
            return Err(DecodeError::MalformedPacket(
                "PUBREL fixed header flags must be 0b0010".into(),
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
                "PUBREL body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::PubRel5(PubRel {
                packet_id,
                reason_code,
                properties,
            }),
            offset,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::PubComp)
    }
}
