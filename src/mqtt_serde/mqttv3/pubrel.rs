// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBREL, MQTT 3.1.1 (spec 3.6). Fixed-header flags are the reserved
/// 0b0010 pattern.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PubRel {
    pub packet_id: u16,
}

impl PubRel {
    pub fn new(packet_id: u16) -> Self {
        PubRel { packet_id }
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
        Ok(self.packet_id.to_be_bytes().to_vec())
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
        if hdr.total_len != hdr.body_start + 2 {
            return Err(DecodeError::MalformedPacket(
                "PUBREL remaining length must be 2".into(),
            ));
        }
        let (packet_id, _) = parse_packet_id(buffer, hdr.body_start)?;
        Ok(Decoded::Packet(
            ControlPacket::PubRel3(PubRel { packet_id }),
            hdr.total_len,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::PubComp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_flag_pattern_on_the_wire() {
        let bytes = PubRel::new(7).to_bytes().unwrap();
        assert_eq!(bytes, vec![0x62, 0x02, 0x00, 0x07]);
    }

    #[test]
    fn zero_flag_nibble_is_malformed() {
        assert!(matches!(
            PubRel::from_bytes(&[0x60, 0x02, 0x00, 0x07]),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
