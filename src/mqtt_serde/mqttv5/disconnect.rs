// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// DISCONNECT, protocol level 5 (spec 3.14). A remaining length of 0 is
/// shorthand for normal disconnection with no properties.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct Disconnect {
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl Disconnect {
    pub fn new(reason_code: u8, properties: Vec<Property>) -> Self {
        Disconnect {
            reason_code,
            properties,
        }
    }
}

impl PacketCodec for Disconnect {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Disconnect
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        if self.reason_code == 0 && self.properties.is_empty() {
            return Ok(Vec::new());
        }
        let mut bytes = vec![self.reason_code];
        bytes.extend(encode_properties(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(Vec::new())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Disconnect)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "DISCONNECT fixed header flags must be 0".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (reason_code, properties) = if offset == hdr.total_len {
            (0x00, Vec::new())
        } else {
            let reason_code = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
            offset += 1;
            let properties = if offset < hdr.total_len {
                let (properties, consumed) = parse_properties(buffer, offset)?;
                offset += consumed;
                properties
            } else {
                Vec::new()
            };
            (reason_code, properties)
        };

        if offset != hdr.total_len {
            return Err(DecodeError::MalformedPacket(format!(
                "DISCONNECT body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::Disconnect5(Disconnect {
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
    fn normal_disconnection_is_two_bytes() {
        assert_eq!(Disconnect::default().to_bytes().unwrap(), vec![0xE0, 0x00]);
        let Decoded::Packet(ControlPacket::Disconnect5(decoded), _) =
            Disconnect::from_bytes(&[0xE0, 0x00]).unwrap()
        else {
            panic!("expected a complete DISCONNECT");
        };
        assert_eq!(decoded, Disconnect::default());
    }

    #[test]
    fn server_shutting_down_round_trip() {
        let disconnect = Disconnect::new(0x8B, vec![Property::ReasonString("maintenance".into())]);
        let bytes = disconnect.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::Disconnect5(decoded), consumed) =
            Disconnect::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete DISCONNECT");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, disconnect);
    }

    #[test]
    fn reason_code_without_properties() {
        // Remaining length 1: reason byte only.
        let bytes = [0xE0, 0x01, 0x04];
        let Decoded::Packet(ControlPacket::Disconnect5(decoded), _) =
            Disconnect::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete DISCONNECT");
        };
        assert_eq!(decoded.reason_code, 0x04);
        assert!(decoded.properties.is_empty());
    }
}
