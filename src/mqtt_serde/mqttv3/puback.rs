// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBACK, MQTT 3.1.1 (spec 3.4): a packet identifier and nothing else.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PubAck {
    pub packet_id: u16,
}

impl PubAck {
    pub fn new(packet_id: u16) -> Self {
        PubAck { packet_id }
    }
}

impl PacketCodec for PubAck {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PubAck
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::PubAck)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "PUBACK fixed header flags must be 0".into(),
            ));
        }
        if hdr.total_len != hdr.body_start + 2 {
            return Err(DecodeError::MalformedPacket(
                "PUBACK remaining length must be 2".into(),
            ));
        }
        let (packet_id, _) = parse_packet_id(buffer, hdr.body_start)?;
        Ok(Decoded::Packet(
            ControlPacket::PubAck3(PubAck { packet_id }),
            hdr.total_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_byte_wire_form() {
        let bytes = PubAck::new(42).to_bytes().unwrap();
        assert_eq!(bytes, vec![0x40, 0x02, 0x00, 0x2A]);
        let Decoded::Packet(ControlPacket::PubAck3(ack), consumed) =
            PubAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBACK");
        };
        assert_eq!(consumed, 4);
        assert_eq!(ack.packet_id, 42);
    }

    #[test]
    fn truncated_puback_asks_for_more() {
        match PubAck::from_bytes(&[0x40, 0x02, 0x00]).unwrap() {
            Decoded::NeedMore(hint) => assert_eq!(hint, 1),
            other => panic!("expected NeedMore, got {other:?}"),
        }
    }
}
