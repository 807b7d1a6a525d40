// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{DecodeError, Decoded, FixedHeader, HeaderStatus};

/// CONNACK, MQTT 3.1.1 (spec 3.2). The body is always two bytes: the
/// session-present flag and a return code in 0..=5.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ConnAck {
    pub session_present: bool,
    pub return_code: u8,
}

impl ConnAck {
    pub fn new(session_present: bool, return_code: u8) -> Self {
        ConnAck {
            session_present,
            return_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.return_code == 0
    }
}

impl PacketCodec for ConnAck {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::ConnAck
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(vec![self.session_present as u8, self.return_code])
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
        if hdr.total_len != hdr.body_start + 2 {
            return Err(DecodeError::MalformedPacket(
                "CONNACK remaining length must be 2".into(),
            ));
        }

        let ack_flags = buffer[hdr.body_start];
        if ack_flags & 0xFE != 0 {
            return Err(DecodeError::MalformedPacket(
                "CONNACK acknowledge flag bits 1-7 are reserved".into(),
            ));
        }
        let return_code = buffer[hdr.body_start + 1];
        if return_code > 5 {
            return Err(DecodeError::MalformedPacket(format!(
                "CONNACK return code {return_code} is undefined"
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::ConnAck3(ConnAck {
                session_present: ack_flags & 0x01 != 0,
                return_code,
            }),
            hdr.total_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_fixture() {
        let bytes = [0x20, 0x02, 0x01, 0x00];
        let Decoded::Packet(ControlPacket::ConnAck3(ack), consumed) =
            ConnAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNACK");
        };
        assert_eq!(consumed, 4);
        assert!(ack.session_present);
        assert!(ack.is_success());
        assert_eq!(ConnAck::new(true, 0).to_bytes().unwrap(), bytes);
    }

    #[test]
    fn bad_credentials_fixture() {
        let bytes = [0x20, 0x02, 0x00, 0x04];
        let Decoded::Packet(ControlPacket::ConnAck3(ack), _) =
            ConnAck::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNACK");
        };
        assert!(!ack.is_success());
        assert_eq!(ack.return_code, 0x04);
    }

    #[test]
    fn undefined_return_code_is_malformed() {
        assert!(matches!(
            ConnAck::from_bytes(&[0x20, 0x02, 0x00, 0x06]),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
