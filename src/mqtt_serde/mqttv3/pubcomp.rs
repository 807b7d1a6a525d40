// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    parse_packet_id, DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// PUBCOMP, MQTT 3.1.1 (spec 3.7): closes the QoS 2 handshake.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PubComp {
    pub packet_id: u16,
}

impl PubComp {
    pub fn new(packet_id: u16) -> Self {
        PubComp { packet_id }
    }
}

impl PacketCodec for PubComp {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PubComp
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
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
        if hdr.total_len != hdr.body_start + 2 {
            return Err(DecodeError::MalformedPacket(
                "PUBCOMP remaining length must be 2".into(),
            ));
        }
        let (packet_id, _) = parse_packet_id(buffer, hdr.body_start)?;
        Ok(Decoded::Packet(
            ControlPacket::PubComp3(PubComp { packet_id }),
            hdr.total_len,
        ))
    }
}
