// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// PINGRESP, MQTT 3.1.1 (spec 3.13): fixed header only.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct PingResp;

impl PacketCodec for PingResp {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::PingResp
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::PingResp)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 || hdr.total_len != hdr.body_start {
            return Err(DecodeError::MalformedPacket(
                "PINGRESP must be exactly a fixed header with zero flags".into(),
            ));
        }
        Ok(Decoded::Packet(
            ControlPacket::PingResp3(PingResp),
            hdr.total_len,
        ))
    }
}
