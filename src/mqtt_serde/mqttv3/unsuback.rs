// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// UNSUBACK, MQTT 3.1.1 (spec 3.11): a packet identifier and nothing else.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct UnsubAck {
    pub packet_id: u16,
}

impl UnsubAck {
    pub fn new(packet_id: u16) -> Self {
        UnsubAck { packet_id }
    }
}

impl PacketCodec for UnsubAck {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::UnsubAck
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
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
        if hdr.total_len != hdr.body_start + 2 {
            return Err(DecodeError::MalformedPacket(
                "UNSUBACK remaining length must be 2".into(),
            ));
        }
        let (packet_id, _) = parse_packet_id(buffer, hdr.body_start)?;
        Ok(Decoded::Packet(
            ControlPacket::UnsubAck3(UnsubAck { packet_id }),
            hdr.total_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let bytes = UnsubAck::new(5).to_bytes().unwrap();
        assert_eq!(bytes, vec![0xB0, 0x02, 0x00, 0x05]);
        let Decoded::Packet(ControlPacket::UnsubAck3(ack), _) =
            UnsubAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete UNSUBACK");
        };
        assert_eq!(ack.packet_id, 5);
    }
}
