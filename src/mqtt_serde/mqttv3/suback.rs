// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// SUBACK, MQTT 3.1.1 (spec 3.9). Return codes are the granted QoS
/// (0, 1, 2) or 0x80 for failure, one per requested filter.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct SubAck {
    pub packet_id: u16,
    pub return_codes: Vec<u8>,
}

impl SubAck {
    pub fn new(packet_id: u16, return_codes: Vec<u8>) -> Self {
        SubAck {
            packet_id,
            return_codes,
        }
    }
}

impl PacketCodec for SubAck {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::SubAck
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.return_codes.clone())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::SubAck)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "SUBACK fixed header flags must be 0".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (packet_id, consumed) = parse_packet_id(buffer, offset)?;
        offset += consumed;

        let return_codes = buffer[offset..hdr.total_len].to_vec();
        if return_codes.is_empty() {
            return Err(DecodeError::ProtocolError(
                "SUBACK carries no return codes".into(),
            ));
        }
        for code in &return_codes {
            if *code > 2 && *code != 0x80 {
                return Err(DecodeError::MalformedPacket(format!(
                    "SUBACK return code 0x{code:02X} is undefined"
                )));
            }
        }

        Ok(Decoded::Packet(
            ControlPacket::SubAck3(SubAck {
                packet_id,
                return_codes,
            }),
            hdr.total_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_and_failed_round_trip() {
        let ack = SubAck::new(11, vec![0x00, 0x02, 0x80]);
        let bytes = ack.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x90, 0x05, 0x00, 0x0B, 0x00, 0x02, 0x80]);
        let Decoded::Packet(ControlPacket::SubAck3(decoded), _) =
            SubAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete SUBACK");
        };
        assert_eq!(decoded, ack);
    }

    #[test]
    fn undefined_return_code_is_malformed() {
        let bytes = [0x90, 0x03, 0x00, 0x0B, 0x03];
        assert!(matches!(
            SubAck::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
