// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// CONNACK, protocol level 5 (spec 3.2). Reason code 0x00 means the
/// connection was accepted; 0x80 and above are refusals.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConnAck {
    pub session_present: bool,
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl ConnAck {
    pub fn new(session_present: bool, reason_code: u8, properties: Vec<Property>) -> Self {
        ConnAck {
            session_present,
            reason_code,
            properties,
        }
    }

    pub fn is_success(&self) -> bool {
        self.reason_code < 0x80
    }
}

impl PacketCodec for ConnAck {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::ConnAck
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = vec![self.session_present as u8, self.reason_code];
        bytes.extend(encode_properties(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::ConnAck)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "CONNACK fixed header flags must be 0".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let ack_flags = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
        if ack_flags & 0xFE != 0 {
            return Err(DecodeError::MalformedPacket(
                "CONNACK acknowledge flag bits 1-7 are reserved".into(),
            ));
        }
        offset += 1;

        let reason_code = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
        offset += 1;

        let (properties, consumed) = parse_properties(buffer, offset)?;
        offset += consumed;

        if offset != hdr.total_len {
            return Err(DecodeError::MalformedPacket(format!(
                "CONNACK body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::ConnAck5(ConnAck {
                session_present: ack_flags & 0x01 != 0,
                reason_code,
                properties,
            }),
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_connack_round_trip() {
        let ack = ConnAck::new(
            true,
            0x00,
            vec![Property::AssignedClientIdentifier("a1".into())],
        );
        let bytes = ack.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::ConnAck5(decoded), consumed) =
            ConnAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNACK");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, ack);
        assert!(decoded.is_success());
    }

    #[test]
    fn minimal_refusal_fixture() {
        // Not authorized, no session, no properties.
        let bytes = [0x20, 0x03, 0x00, 0x87, 0x00];
        let Decoded::Packet(ControlPacket::ConnAck5(ack), _) = ConnAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNACK");
        };
        assert!(!ack.session_present);
        assert!(!ack.is_success());
        assert_eq!(ack.reason_code, 0x87);
    }

    #[test]
    fn reserved_acknowledge_bits_are_malformed() {
        let bytes = [0x20, 0x03, 0x02, 0x00, 0x00];
        assert!(matches!(
            ConnAck::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
