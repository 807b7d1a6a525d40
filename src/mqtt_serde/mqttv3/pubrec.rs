// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBREC, MQTT 3.1.1 (spec 3.5): first acknowledgment of QoS 2.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PubRec {
    pub packet_id: u16,
}

impl PubRec {
    pub fn new(packet_id: u16) -> Self {
        PubRec { packet_id }
    }
}

impl PacketCodec for PubRec {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PubRec
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
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
        if hdr.total_len != hdr.body_start + 2 {
            return Err(DecodeError::MalformedPacket(
                "PUBREC remaining length must be 2".into(),
            ));
        }
        let (packet_id, _) = parse_packet_id(buffer, hdr.body_start)?;
        Ok(Decoded::Packet(
            ControlPacket::PubRec3(PubRec { packet_id }),
            hdr.total_len,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::PubRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let bytes = PubRec::new(512).to_bytes().unwrap();
        assert_eq!(bytes, vec![0x50, 0x02, 0x02, 0x00]);
        let Decoded::Packet(ControlPacket::PubRec3(rec), _) =
            PubRec::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBREC");
        };
        assert_eq!(rec.packet_id, 512);
        assert_eq!(rec.expected_response(), Some(ControlPacketType::PubRel));
    }
}
