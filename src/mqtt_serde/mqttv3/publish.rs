// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{
    ControlPacket, ControlPacketType, MqttWarning, PacketCodec,
};
use crate::mqtt_serde::parser::{
    encode_utf8_string, parse_packet_id, parse_utf8_string, DecodeError, Decoded, FixedHeader,
    HeaderStatus,
};

/// PUBLISH, MQTT 3.1.1 (spec 3.3). Same flag layout as level 5 but no
/// properties block; the payload starts right after the packet id.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Publish {
    pub dup: bool,
    pub qos: u8,
    pub retain: bool,
    pub topic_name: String,
    /// Present exactly when `qos > 0`.
    pub packet_id: Option<u16>,
    pub payload: Vec<u8>,
}

impl Publish {
    pub fn new(topic_name: impl Into<String>, payload: Vec<u8>, qos: u8) -> Self {
        Publish {
            dup: false,
            qos,
            retain: false,
            topic_name: topic_name.into(),
            packet_id: None,
            payload,
        }
    }
}

impl PacketCodec for Publish {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Publish
    }

    fn flags(&self) -> u8 {
        let mut flags = self.qos << 1;
        if self.dup {
            flags |= 0x08;
        }
        if self.retain {
            flags |= 0x01;
        }
        flags
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = encode_utf8_string(&self.topic_name)?;
        match (self.qos, self.packet_id) {
            (0, _) => {}
            (_, Some(id)) => bytes.extend(id.to_be_bytes()),
            (_, None) => {
                return Err(DecodeError::ProtocolError(
                    "QoS 1 and 2 PUBLISH requires a packet identifier".into(),
                ))
            }
        }
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.payload.clone())
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Publish)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        let qos = (hdr.flags >> 1) & 0x03;
        if qos == 3 {
            return Err(DecodeError::MalformedPacket("PUBLISH QoS 3 is invalid".into()));
        }
        let dup = hdr.flags & 0x08 != 0;
        if qos == 0 && dup {
            return Err(DecodeError::MalformedPacket(
                "DUP must be 0 for a QoS 0 PUBLISH".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (topic_name, consumed) = parse_utf8_string(buffer, offset)?;
        offset += consumed;

        let packet_id = if qos > 0 {
            let (id, consumed) = parse_packet_id(buffer, offset)?;
            offset += consumed;
            Some(id)
        } else {
            None
        };

        if offset > hdr.total_len {
            return Err(DecodeError::MalformedPacket(
                "PUBLISH variable header overruns the declared length".into(),
            ));
        }
        let payload = buffer[offset..hdr.total_len].to_vec();

        Ok(Decoded::Packet(
            ControlPacket::Publish3(Publish {
                dup,
                qos,
                retain: hdr.flags & 0x01 != 0,
                topic_name,
                packet_id,
                payload,
            }),
            hdr.total_len,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        match self.qos {
            1 => Some(ControlPacketType::PubAck),
            2 => Some(ControlPacketType::PubRec),
            _ => None,
        }
    }

    fn validate(&self) -> Option<MqttWarning> {
        if self.topic_name.contains(['+', '#']) {
            return Some(MqttWarning(
                "PUBLISH topic name contains wildcard characters".into(),
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos0_fixture() {
        // Topic "a/b", payload "hi".
        let publish = Publish::new("a/b", b"hi".to_vec(), 0);
        let bytes = publish.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x30, 0x07, 0x00, 0x03, b'a', b'/', b'b', b'h', b'i']);
    }

    #[test]
    fn qos1_round_trip() {
        let mut publish = Publish::new("events", b"payload".to_vec(), 1);
        publish.packet_id = Some(99);
        let bytes = publish.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::Publish3(decoded), consumed) =
            Publish::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBLISH");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, publish);
        assert_eq!(decoded.expected_response(), Some(ControlPacketType::PubAck));
    }

    #[test]
    fn dup_on_qos0_is_malformed() {
        let mut bytes = Publish::new("a", vec![], 0).to_bytes().unwrap();
        bytes[0] |= 0x08;
        assert!(matches!(
            Publish::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
