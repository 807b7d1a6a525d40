// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// AUTH, protocol level 5 only (spec 3.15). Carries an extended
/// authentication exchange; a remaining length of 0 means reason 0x00
/// (success) with no properties.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct Auth {
    pub reason_code: u8,
    pub properties: Vec<Property>,
}

impl Auth {
    pub fn new(reason_code: u8, properties: Vec<Property>) -> Self {
        Auth {
            reason_code,
            properties,
        }
    }
}

impl PacketCodec for Auth {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Auth
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
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Auth)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "AUTH fixed header flags must be 0".into(),
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
                "AUTH body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::Auth(Auth {
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
    fn continue_authentication_round_trip() {
        let auth = Auth::new(
            0x18,
            vec![
                Property::AuthenticationMethod("SCRAM-SHA-1".into()),
                Property::AuthenticationData(vec![0xDE, 0xAD]),
            ],
        );
        let bytes = auth.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::Auth(decoded), consumed) =
            Auth::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete AUTH");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, auth);
    }

    #[test]
    fn empty_auth_is_success() {
        let Decoded::Packet(ControlPacket::Auth(decoded), _) =
            Auth::from_bytes(&[0xF0, 0x00]).unwrap()
        else {
            panic!("expected a complete AUTH");
        };
        assert_eq!(decoded.reason_code, 0x00);
    }
}
