// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// DISCONNECT, MQTT 3.1.1 (spec 3.14): fixed header only, no reason
/// codes at this protocol level.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct Disconnect;

impl PacketCodec for Disconnect {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Disconnect
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Disconnect)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 || hdr.total_len != hdr.body_start {
            return Err(DecodeError::MalformedPacket(
                "DISCONNECT must be exactly a fixed header with zero flags".into(),
            ));
        }
        Ok(Decoded::Packet(
            ControlPacket::Disconnect3(Disconnect),
            hdr.total_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_wire_form() {
        assert_eq!(Disconnect.to_bytes().unwrap(), vec![0xE0, 0x00]);
        let Decoded::Packet(ControlPacket::Disconnect3(_), consumed) =
            Disconnect::from_bytes(&[0xE0, 0x00]).unwrap()
        else {
            panic!("expected a complete DISCONNECT");
        };
        assert_eq!(consumed, 2);
    }
}
