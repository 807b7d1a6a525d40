// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{
    ControlPacket, ControlPacketType, MqttWarning, PacketCodec,
};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    encode_utf8_string, parse_packet_id, parse_utf8_string, DecodeError, Decoded, FixedHeader,
    HeaderStatus,
};

/// PUBLISH, protocol level 5 (spec 3.3). The only packet type that uses
/// all four fixed-header flag bits: DUP, a two-bit QoS, and RETAIN.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Publish {
    pub dup: bool,
    pub qos: u8,
    pub retain: bool,
    pub topic_name: String,
    /// Present exactly when `qos > 0`.
    pub packet_id: Option<u16>,
    pub properties: Vec<Property>,
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
            properties: Vec::new(),
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
        bytes.extend(encode_properties(&self.properties)?);
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

        let (properties, consumed) = parse_properties(buffer, offset)?;
        offset += consumed;

        if offset > hdr.total_len {
            return Err(DecodeError::MalformedPacket(
                "PUBLISH variable header overruns the declared length".into(),
            ));
        }
        let payload = buffer[offset..hdr.total_len].to_vec();

        Ok(Decoded::Packet(
            ControlPacket::Publish5(Publish {
                dup,
                qos,
                retain: hdr.flags & 0x01 != 0,
                topic_name,
                packet_id,
                properties,
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
    fn qos0_round_trip() {
        let publish = Publish::new("sensors/temp", b"21.5".to_vec(), 0);
        let bytes = publish.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x30);
        let Decoded::Packet(ControlPacket::Publish5(decoded), consumed) =
            Publish::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBLISH");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, publish);
        assert_eq!(decoded.expected_response(), None);
    }

    #[test]
    fn qos2_retained_dup_flag_bits() {
        let mut publish = Publish::new("a/b", vec![1, 2, 3], 2);
        publish.packet_id = Some(7);
        publish.dup = true;
        publish.retain = true;
        let bytes = publish.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x3D); // 0b0011_1101
        let Decoded::Packet(ControlPacket::Publish5(decoded), _) =
            Publish::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete PUBLISH");
        };
        assert_eq!(decoded, publish);
        assert_eq!(decoded.expected_response(), Some(ControlPacketType::PubRec));
    }

    #[test]
    fn qos1_without_packet_id_fails_to_encode() {
        let publish = Publish::new("a", vec![], 1);
        assert!(matches!(
            publish.to_bytes(),
            Err(DecodeError::ProtocolError(_))
        ));
    }

    #[test]
    fn qos3_on_the_wire_is_malformed() {
        let mut bytes = Publish::new("a", vec![], 0).to_bytes().unwrap();
        bytes[0] |= 0x06;
        assert!(matches!(
            Publish::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }

    #[test]
    fn zero_packet_id_is_a_protocol_error() {
        // QoS 1, topic "a", packet id 0, empty properties.
        let bytes = [0x32, 0x06, 0x00, 0x01, b'a', 0x00, 0x00, 0x00];
        assert!(matches!(
            Publish::from_bytes(&bytes),
            Err(DecodeError::ProtocolError(_))
        ));
    }

    #[test]
    fn wildcard_topic_gets_a_warning() {
        assert!(Publish::new("a/+/b", vec![], 0).validate().is_some());
        assert!(Publish::new("a/b", vec![], 0).validate().is_none());
    }
}
