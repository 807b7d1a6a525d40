// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    encode_utf8_string, parse_packet_id, parse_utf8_string, DecodeError, Decoded, FixedHeader,
    HeaderStatus,
};

/// UNSUBSCRIBE, MQTT 3.1.1 (spec 3.10). Flags are the reserved 0b0010
/// pattern.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Unsubscribe {
    pub packet_id: u16,
    pub topic_filters: Vec<String>,
}

impl Unsubscribe {
    pub fn new(packet_id: u16, topic_filters: Vec<String>) -> Self {
        Unsubscribe {
            packet_id,
            topic_filters,
        }
    }
}

impl PacketCodec for Unsubscribe {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Unsubscribe
    }

    fn flags(&self) -> u8 {
        0x02
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        if self.topic_filters.is_empty() {
            return Err(DecodeError::ProtocolError(
                "UNSUBSCRIBE requires at least one topic filter".into(),
            ));
        }
        let mut bytes = Vec::new();
        for filter in &self.topic_filters {
            bytes.extend(encode_utf8_string(filter)?);
        }
        Ok(bytes)
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Unsubscribe)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0x02 {
            return Err(DecodeError::MalformedPacket(
                "UNSUBSCRIBE fixed header flags must be 0b0010".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (packet_id, consumed) = parse_packet_id(buffer, offset)?;
        offset += consumed;

        let mut topic_filters = Vec::new();
        while offset < hdr.total_len {
            let (filter, consumed) = parse_utf8_string(buffer, offset)?;
            offset += consumed;
            topic_filters.push(filter);
        }
        if topic_filters.is_empty() {
            return Err(DecodeError::ProtocolError(
                "UNSUBSCRIBE carries no topic filters".into(),
            ));
        }

        if offset != hdr.total_len {
            return Err(DecodeError::MalformedPacket(format!(
                "UNSUBSCRIBE body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::Unsubscribe3(Unsubscribe {
                packet_id,
                topic_filters,
            }),
            offset,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::UnsubAck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let unsubscribe = Unsubscribe::new(5, vec!["a".into(), "b/c".into()]);
        let bytes = unsubscribe.to_bytes().unwrap();
        assert_eq!(bytes[0], 0xA2);
        let Decoded::Packet(ControlPacket::Unsubscribe3(decoded), consumed) =
            Unsubscribe::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete UNSUBSCRIBE");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, unsubscribe);
    }
}
