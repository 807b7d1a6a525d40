// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// PINGREQ, MQTT 3.1.1 (spec 3.12): fixed header only.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct PingReq;

impl PacketCodec for PingReq {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PingReq
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::PingReq)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 || hdr.total_len != hdr.body_start {
            return Err(DecodeError::MalformedPacket(
                "PINGREQ must be exactly a fixed header with zero flags".into(),
            ));
        }
        Ok(Decoded::Packet(
            ControlPacket::PingReq3(PingReq),
            hdr.total_len,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::PingResp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_wire_form() {
        assert_eq!(PingReq.to_bytes().unwrap(), vec![0xC0, 0x00]);
    }
}
