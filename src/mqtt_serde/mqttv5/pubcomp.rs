// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBCOMP, protocol level 5 (spec 3.7): closes the QoS 2 handshake.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PubComp {
    pub packet_id: u16,
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl PubComp {
    pub fn new(packet_id: u16, reason_code: u8, properties: Vec<Property>) -> Self {
        PubComp {
            packet_id,
            reason_code,
            properties,
        }
    }
}

impl PacketCodec for PubComp {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PubComp
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
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::PubComp)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "PUBCOMP fixed header flags must be 0".into(),
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
                "PUBCOMP body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::PubComp5(PubComp {
                packet_id,
                reason_code,
                properties,
            }),
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trip() {
        let comp = PubComp::new(1024, 0x00, vec![]);
        let bytes = comp.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x70, 0x02, 0x04, 0x00]);
        let Decoded::Packet(ControlPacket::PubComp5(decoded), _) =
            PubComp::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBCOMP");
        };
        assert_eq!(decoded, comp);
    }

    #[test]
    fn packet_identifier_not_found_round_trip() {
        let comp = PubComp::new(3, 0x92, vec![Property::ReasonString("unknown id".into())]);
        let bytes = comp.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::PubComp5(decoded), consumed) =
            PubComp::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBCOMP");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, comp);
    }
}
