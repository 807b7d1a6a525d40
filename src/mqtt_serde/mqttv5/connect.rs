// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{
    client_id_warning, ControlPacket, ControlPacketType, MqttWarning, PacketCodec,
};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::mqttv5::will::Will;
use crate::mqtt_serde::parser::{
    encode_binary_data, encode_utf8_string, parse_binary_data, parse_utf8_string, DecodeError,
    Decoded, FixedHeader, HeaderStatus,
};

/// CONNECT, protocol level 5 (spec 3.1).
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Connect {
    pub client_id: String,
    pub keep_alive: u16,
    pub clean_start: bool,
    pub will: Option<Will>,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub properties: Vec<Property>,
}

impl Connect {
    pub fn new(client_id: impl Into<String>) -> Self {
        Connect {
            client_id: client_id.into(),
            keep_alive: u16::MAX,
            clean_start: false,
            will: None,
            username: None,
            password: None,
            properties: Vec::new(),
        }
    }

    fn connect_flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.clean_start {
            flags |= 0x02;
        }
        if let Some(will) = &self.will {
            flags |= 0x04 | (will.qos << 3);
            if will.retain {
                flags |= 0x20;
            }
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        if self.username.is_some() {
            flags |= 0x80;
        }
        flags
    }
}

impl PacketCodec for Connect {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Connect
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = encode_utf8_string("MQTT")?;
        bytes.push(5); // protocol level
        bytes.push(self.connect_flags());
        bytes.extend(self.keep_alive.to_be_bytes());
        bytes.extend(encode_properties(&self.properties)?);
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = encode_utf8_string(&self.client_id)?;
        if let Some(will) = &self.will {
            bytes.extend(will.encode()?);
        }
        if let Some(username) = &self.username {
            bytes.extend(encode_utf8_string(username)?);
        }
        if let Some(password) = &self.password {
            bytes.extend(encode_binary_data(password)?);
        }
        Ok(bytes)
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Connect)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0 {
            return Err(DecodeError::MalformedPacket(
                "CONNECT fixed header flags must be 0".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (protocol_name, consumed) = parse_utf8_string(buffer, offset)?;
        if protocol_name != "MQTT" {
            return Err(DecodeError::MalformedPacket(format!(
                "unexpected protocol name {protocol_name:?}"
            )));
        }
        offset += consumed;

        let protocol_level = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
        if protocol_level != 5 {
            return Err(DecodeError::MalformedPacket(format!(
                "protocol level {protocol_level} on a level-5 stream"
            )));
        }
        offset += 1;

        let connect_flags = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
        offset += 1;
        if connect_flags & 0x01 != 0 {
            return Err(DecodeError::MalformedPacket(
                "CONNECT reserved flag bit must be 0".into(),
            ));
        }
        let will_flag = connect_flags & 0x04 != 0;
        let will_qos = (connect_flags >> 3) & 0x03;
        if will_qos == 3 {
            return Err(DecodeError::MalformedPacket("will QoS 3 is invalid".into()));
        }
        if !will_flag && (will_qos != 0 || connect_flags & 0x20 != 0) {
            return Err(DecodeError::MalformedPacket(
                "will QoS and retain must be 0 when the will flag is 0".into(),
            ));
        }

        let (keep_alive, consumed) = crate::mqtt_serde::parser::parse_u16(buffer, offset)?;
        offset += consumed;

        let (properties, consumed) = parse_properties(buffer, offset)?;
        offset += consumed;

        let (client_id, consumed) = parse_utf8_string(buffer, offset)?;
        offset += consumed;

        let will = if will_flag {
            let (will, consumed) = Will::from_bytes(buffer, offset, connect_flags)?;
            offset += consumed;
            if will.topic.is_empty() {
                return Err(DecodeError::ProtocolError("will topic is empty".into()));
            }
            Some(will)
        } else {
            None
        };

        let username = if connect_flags & 0x80 != 0 {
            let (username, consumed) = parse_utf8_string(buffer, offset)?;
            offset += consumed;
            Some(username)
        } else {
            None
        };
        let password = if connect_flags & 0x40 != 0 {
            let (password, consumed) = parse_binary_data(buffer, offset)?;
            offset += consumed;
            Some(password)
        } else {
            None
        };

        if offset != hdr.total_len {
            return Err(DecodeError::MalformedPacket(format!(
                "CONNECT body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::Connect5(Connect {
                client_id,
                keep_alive,
                clean_start: connect_flags & 0x02 != 0,
                will,
                username,
                password,
                properties,
            }),
            offset,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::ConnAck)
    }

    fn validate(&self) -> Option<MqttWarning> {
        client_id_warning(&self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_connect_wire_size() {
        // Proto name (6) + level + flags + keep alive (2) + empty props (1)
        // + empty client id (2) = 13 bytes of body.
        let bytes = Connect::new("").to_bytes().unwrap();
        assert_eq!(bytes[1], 13);
        assert_eq!(bytes.len(), 15);
    }

    #[test]
    fn truncated_connect_reports_missing_bytes() {
        let buffer = [
            0x10, 0x0D, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x00, 0x00, 0x00, 0x3C,
        ];
        match Connect::from_bytes(&buffer).unwrap() {
            Decoded::NeedMore(hint) => assert_eq!(hint, 2),
            other => panic!("expected NeedMore, got {other:?}"),
        }
    }

    #[test]
    fn decode_session_expiry_connect_fixture() {
        let bytes = vec![
            0x10, 0x22, 0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, 0x05, 0x02, 0x01, 0x2C, 0x05, 0x11,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x71, 0x75, 0x69, 0x63, 0x5F, 0x62, 0x65, 0x6E,
            0x63, 0x68, 0x5F, 0x70, 0x75, 0x62, 0x5F, 0x31,
        ];
        let Decoded::Packet(ControlPacket::Connect5(connect), consumed) =
            Connect::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNECT");
        };
        assert_eq!(consumed, 36);
        assert_eq!(connect.keep_alive, 300);
        assert!(connect.clean_start);
        assert_eq!(connect.client_id, "quic_bench_pub_1");
        assert_eq!(connect.properties, vec![Property::SessionExpiryInterval(0)]);
    }

    #[test]
    fn round_trip_with_will_and_credentials() {
        let mut connect = Connect::new("test-client");
        connect.keep_alive = 15;
        connect.clean_start = true;
        connect.username = Some("user".into());
        connect.password = Some(b"secret".to_vec());
        connect.will = Some(Will::new("w/t".into(), b"bye".to_vec(), 1, true));
        connect.properties = vec![Property::SessionExpiryInterval(3600)];

        let bytes = connect.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::Connect5(decoded), consumed) =
            Connect::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNECT");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, connect);
    }

    #[test]
    fn reserved_flag_bit_is_malformed() {
        let mut bytes = Connect::new("c").to_bytes().unwrap();
        bytes[9] |= 0x01;
        assert!(matches!(
            Connect::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }

    #[test]
    fn will_bits_without_will_flag_are_malformed() {
        let mut bytes = Connect::new("c").to_bytes().unwrap();
        bytes[9] |= 0x08; // will QoS 1, will flag clear
        assert!(matches!(
            Connect::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }

    #[test]
    fn connect_expects_connack() {
        assert_eq!(
            Connect::new("c").expected_response(),
            Some(ControlPacketType::ConnAck)
        );
    }
}
