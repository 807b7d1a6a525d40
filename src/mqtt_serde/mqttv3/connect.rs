// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{
    client_id_warning, ControlPacket, ControlPacketType, MqttWarning, PacketCodec,
};
use crate::mqtt_serde::parser::{
    encode_binary_data, encode_utf8_string, parse_binary_data, parse_u16, parse_utf8_string,
    DecodeError, Decoded, FixedHeader, HeaderStatus,
};

/// Last-will message of a 3.1.1 CONNECT. No properties at this protocol
/// level; QoS and retain ride in the connect flag byte.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Will {
    pub qos: u8,
    pub retain: bool,
    pub topic: String,
    pub message: Vec<u8>,
}

impl Will {
    pub fn new(topic: String, message: Vec<u8>, qos: u8, retain: bool) -> Self {
        Will {
            qos,
            retain,
            topic,
            message,
        }
    }
}

/// CONNECT, protocol level 4 / MQTT 3.1.1 (spec 3.1).
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Connect {
    pub client_id: String,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub will: Option<Will>,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
}

impl Connect {
    pub fn new(client_id: impl Into<String>) -> Self {
        Connect {
            client_id: client_id.into(),
            keep_alive: u16::MAX,
            clean_session: false,
            will: None,
            username: None,
            password: None,
        }
    }

    fn connect_flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.clean_session {
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
        bytes.push(4); // protocol level
        bytes.push(self.connect_flags());
        bytes.extend(self.keep_alive.to_be_bytes());
        Ok(bytes)
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = encode_utf8_string(&self.client_id)?;
        if let Some(will) = &self.will {
            bytes.extend(encode_utf8_string(&will.topic)?);
            bytes.extend(encode_binary_data(&will.message)?);
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
        if protocol_level != 4 {
            return Err(DecodeError::MalformedPacket(format!(
                "protocol level {protocol_level} on a level-4 stream"
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

        let (keep_alive, consumed) = parse_u16(buffer, offset)?;
        offset += consumed;

        let (client_id, consumed) = parse_utf8_string(buffer, offset)?;
        offset += consumed;

        let will = if will_flag {
            let (topic, consumed) = parse_utf8_string(buffer, offset)?;
            offset += consumed;
            let (message, consumed) = parse_binary_data(buffer, offset)?;
            offset += consumed;
            Some(Will::new(
                topic,
                message,
                will_qos,
                connect_flags & 0x20 != 0,
            ))
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
            ControlPacket::Connect3(Connect {
                client_id,
                keep_alive,
                clean_session: connect_flags & 0x02 != 0,
                will,
                username,
                password,
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
        // Proto name (6) + level + flags + keep alive (2) + empty client
        // id (2) = 12 bytes of body.
        let bytes = Connect::new("").to_bytes().unwrap();
        assert_eq!(bytes[1], 12);
        assert_eq!(bytes.len(), 14);
    }

    #[test]
    fn full_connect_round_trip() {
        let mut connect = Connect::new("reader-1");
        connect.keep_alive = 30;
        connect.clean_session = true;
        connect.will = Some(Will::new("state/reader-1".into(), b"offline".to_vec(), 1, true));
        connect.username = Some("user".into());
        connect.password = Some(b"pass".to_vec());

        let bytes = connect.to_bytes().unwrap();
        let Decoded::Packet(ControlPacket::Connect3(decoded), consumed) =
            Connect::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete CONNECT");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, connect);
    }

    #[test]
    fn flag_byte_layout() {
        let mut connect = Connect::new("c");
        connect.clean_session = true;
        connect.will = Some(Will::new("t".into(), vec![], 2, true));
        connect.username = Some("u".into());
        connect.password = Some(vec![]);
        // username | password | retain | qos2 | will | clean
        assert_eq!(connect.connect_flags(), 0b1111_0110);
    }

    #[test]
    fn level_5_on_a_v3_decode_is_malformed() {
        let mut bytes = Connect::new("c").to_bytes().unwrap();
        bytes[8] = 5;
        assert!(matches!(
            Connect::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
